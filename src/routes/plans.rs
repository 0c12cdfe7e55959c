use axum::{Json, extract::rejection::JsonRejection};

use crate::{
    error::AppResult,
    planner::PaymentPlan,
    validation::{PlanEditRequest, json_rejection},
};

/// Applies one edit to a draft plan and returns the new draft. Nothing is
/// stored; the client submits the final plan through the installments route.
pub async fn edit(
    payload: Result<Json<PlanEditRequest>, JsonRejection>,
) -> AppResult<Json<PaymentPlan>> {
    let Json(request) = payload.map_err(json_rejection)?;
    Ok(Json(request.plan.apply(&request.edit)?))
}
