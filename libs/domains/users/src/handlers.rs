use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{ApiResponse, ValidatedJson, errors::handlers::method_not_allowed};
use std::sync::Arc;

use crate::error::UserResult;
use crate::models::{CreateUser, UpdateUser, User};
use crate::repository::UserRepository;
use crate::service::UserService;

/// Create the users router with all HTTP endpoints
///
/// Mount it under `/users`:
/// - `GET /` and `POST /`
/// - `GET /{id}`, `PATCH /{id}` and `DELETE /{id}`
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route(
            "/",
            get(list_users::<R>)
                .post(create_user::<R>)
                .fallback(method_not_allowed),
        )
        .route(
            "/{id}",
            get(get_user::<R>)
                .patch(update_user::<R>)
                .delete(delete_user::<R>)
                .fallback(method_not_allowed),
        )
        .with_state(shared_service)
}

async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User created successfully", user),
    ))
}

async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<ApiResponse<Vec<User>>> {
    let users = service.list_users().await?;
    Ok(ApiResponse::ok("Users retrieved successfully", users))
}

async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<String>,
) -> UserResult<ApiResponse<User>> {
    let user = service.get_user(&id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> UserResult<ApiResponse<User>> {
    let user = service.update_user(&id, input).await?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

/// The removed record is not echoed back.
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<String>,
) -> UserResult<ApiResponse<()>> {
    service.delete_user(&id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
