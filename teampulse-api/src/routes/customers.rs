/// Customer endpoints (current team)
///
/// - `GET /v1/customers` - Customers of the current team
/// - `POST /v1/customers` - Create (`create projects`)

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use teampulse_shared::{
    auth::{authorization::TeamContext, permission::TeamPermission},
    models::customer::{CreateCustomer, Customer},
};
use validator::Validate;

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
) -> ApiResult<Json<Vec<Customer>>> {
    let customers = Customer::list_for_team(&state.db, ctx.team_id).await?;
    Ok(Json(customers))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 255, message = "The name field is required."))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 64))]
    pub phone: Option<String>,

    #[validate(length(max = 255))]
    pub company: Option<String>,

    #[validate(length(max = 255))]
    pub address: Option<String>,

    #[validate(length(max = 255))]
    pub city: Option<String>,

    #[validate(length(max = 255))]
    pub country: Option<String>,

    pub notes: Option<String>,
}

impl From<CustomerRequest> for CreateCustomer {
    fn from(req: CustomerRequest) -> Self {
        CreateCustomer {
            name: req.name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            company: req.company,
            address: req.address,
            city: req.city,
            country: req.country,
            notes: req.notes,
        }
    }
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(ctx): Extension<TeamContext>,
    Json(req): Json<CustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    ctx.require(TeamPermission::CreateProjects)?;
    req.validate()?;

    let customer = Customer::create(&state.db, ctx.team_id, req.into()).await?;

    tracing::info!(customer_id = %customer.id, team_id = %ctx.team_id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}
