//! Role-based access control extractors for administration routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use millwright_core::error::CoreError;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `manager` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn manager_only(RequireManager(user): RequireManager) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_manager() {
            return Err(AppError::Core(CoreError::PermissionDenied(
                "Manager role required".into(),
            )));
        }
        Ok(RequireManager(user))
    }
}
