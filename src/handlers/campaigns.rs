use super::{require_client, today};
use crate::activity;
use crate::auth::CurrentUser;
use crate::campaigns::{self, CampaignSummary, CampaignView};
use crate::errors::AppError;
use crate::models::{ActivityKind, CampaignInput, CampaignQuery};
use crate::state::AppState;
use crate::storage::persist_data;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> Json<Vec<CampaignView>> {
    let data = state.data.lock().await;
    Json(campaigns::list_campaigns(&data, &query))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CampaignView>, AppError> {
    let data = state.data.lock().await;
    data.campaigns
        .get(&id)
        .map(|campaign| Json(CampaignView::from(campaign)))
        .ok_or_else(|| AppError::not_found(format!("campaign {id} not found")))
}

pub async fn client_summary(
    State(state): State<AppState>,
    Path(client_id): Path<u64>,
) -> Result<Json<CampaignSummary>, AppError> {
    let data = state.data.lock().await;
    require_client(&data, client_id)?;
    Ok(Json(campaigns::client_summary(&data, client_id)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CampaignInput>,
) -> Result<(StatusCode, Json<CampaignView>), AppError> {
    let mut data = state.data.lock().await;
    if let Some(client_id) = input.client_id {
        require_client(&data, client_id)?;
    }
    let campaign = campaigns::create_campaign(&mut data, input, today())?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Campaign,
        "created",
        Some(campaign.client_id),
        format!("Created campaign {}", campaign.name),
    );
    persist_data(&state.data_path, &data).await?;
    info!(campaign_id = campaign.id, client_id = campaign.client_id, "campaign created");
    Ok((StatusCode::CREATED, Json(CampaignView::from(&campaign))))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
    Json(input): Json<CampaignInput>,
) -> Result<Json<CampaignView>, AppError> {
    let mut data = state.data.lock().await;
    let campaign = data
        .campaigns
        .get_mut(&id)
        .ok_or_else(|| AppError::not_found(format!("campaign {id} not found")))?;
    campaigns::apply_input(campaign, input)?;
    let view = CampaignView::from(&*campaign);

    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Campaign,
        "updated",
        Some(view.campaign.client_id),
        format!("Updated campaign {}", view.campaign.name),
    );
    persist_data(&state.data_path, &data).await?;
    info!(campaign_id = id, "campaign updated");
    Ok(Json(view))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let mut data = state.data.lock().await;
    let campaign = data
        .campaigns
        .remove(&id)
        .ok_or_else(|| AppError::not_found(format!("campaign {id} not found")))?;
    activity::record(
        &mut data,
        Some(&user.username),
        ActivityKind::Campaign,
        "deleted",
        Some(campaign.client_id),
        format!("Deleted campaign {}", campaign.name),
    );
    persist_data(&state.data_path, &data).await?;
    info!(campaign_id = id, "campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}
