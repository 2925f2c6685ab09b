use crate::billing::{money_input, round_money};
use crate::errors::ValidationError;
use crate::models::{Campaign, CampaignInput, CampaignQuery, CampaignStatus, Database, Platform};
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CampaignMetrics {
    /// Click-through rate in percent.
    pub ctr: Option<f64>,
    pub cpc: Option<Decimal>,
    pub cpa: Option<Decimal>,
    pub conversion_rate: Option<f64>,
    pub budget_remaining: Decimal,
    pub budget_used_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub metrics: CampaignMetrics,
}

impl From<&Campaign> for CampaignView {
    fn from(campaign: &Campaign) -> Self {
        Self {
            metrics: metrics(
                campaign.budget,
                campaign.spend,
                campaign.impressions,
                campaign.clicks,
                campaign.conversions,
            ),
            campaign: campaign.clone(),
        }
    }
}

pub fn metrics(
    budget: Decimal,
    spend: Decimal,
    impressions: u64,
    clicks: u64,
    conversions: u64,
) -> CampaignMetrics {
    CampaignMetrics {
        ctr: percent(clicks as f64, impressions as f64),
        cpc: per_unit(spend, clicks),
        cpa: per_unit(spend, conversions),
        conversion_rate: percent(conversions as f64, clicks as f64),
        budget_remaining: budget.saturating_sub(spend),
        budget_used_pct: spend
            .to_f64()
            .zip(budget.to_f64())
            .and_then(|(spend, budget)| percent(spend, budget)),
    }
}

fn percent(part: f64, whole: f64) -> Option<f64> {
    (whole > 0.0).then(|| (part / whole * 10_000.0).round() / 100.0)
}

fn per_unit(spend: Decimal, units: u64) -> Option<Decimal> {
    spend.checked_div(Decimal::from(units)).map(round_money)
}

pub fn create_campaign(
    db: &mut Database,
    input: CampaignInput,
    today: NaiveDate,
) -> Result<Campaign, ValidationError> {
    let client_id = input.client_id.ok_or(ValidationError::Empty("client_id"))?;
    if input.name.is_none() {
        return Err(ValidationError::Empty("name"));
    }
    let now = Utc::now();
    let mut campaign = Campaign {
        id: 0,
        client_id,
        name: String::new(),
        platform: Platform::Other,
        status: CampaignStatus::Planned,
        budget: Decimal::ZERO,
        spend: Decimal::ZERO,
        start_date: today,
        end_date: None,
        impressions: 0,
        clicks: 0,
        conversions: 0,
        notes: None,
        created_at: now,
        updated_at: now,
    };
    apply_input(&mut campaign, input)?;
    campaign.id = db.next_campaign_id();
    db.campaigns.insert(campaign.id, campaign.clone());
    Ok(campaign)
}

/// Applies the present fields. `client_id` is only honoured on create.
pub fn apply_input(campaign: &mut Campaign, input: CampaignInput) -> Result<(), ValidationError> {
    let mut next = campaign.clone();
    if let Some(name) = input.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty("name"));
        }
        next.name = name.to_string();
    }
    if let Some(platform) = input.platform {
        next.platform = platform;
    }
    if let Some(status) = input.status {
        next.status = status;
    }
    if let Some(budget) = input.budget {
        next.budget = money_input("budget", budget)?;
    }
    if let Some(spend) = input.spend {
        next.spend = money_input("spend", spend)?;
    }
    if let Some(start) = input.start_date {
        next.start_date = start;
    }
    if input.end_date.is_some() {
        next.end_date = input.end_date;
    }
    if next.end_date.is_some_and(|end| end < next.start_date) {
        return Err(ValidationError::DateRange);
    }
    if let Some(impressions) = input.impressions {
        next.impressions = impressions;
    }
    if let Some(clicks) = input.clicks {
        next.clicks = clicks;
    }
    if let Some(conversions) = input.conversions {
        next.conversions = conversions;
    }
    if let Some(notes) = input.notes {
        let notes = notes.trim();
        next.notes = (!notes.is_empty()).then(|| notes.to_string());
    }
    next.updated_at = Utc::now();
    *campaign = next;
    Ok(())
}

pub fn list_campaigns(db: &Database, query: &CampaignQuery) -> Vec<CampaignView> {
    let mut campaigns: Vec<&Campaign> = db
        .campaigns
        .values()
        .filter(|campaign| query.client_id.is_none_or(|id| campaign.client_id == id))
        .filter(|campaign| query.status.is_none_or(|status| campaign.status == status))
        .collect();
    campaigns.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));
    campaigns.into_iter().map(CampaignView::from).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub client_id: u64,
    pub campaigns: usize,
    pub active: usize,
    pub budget: Decimal,
    pub spend: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub metrics: CampaignMetrics,
}

/// Totals over a client's campaigns with blended rates.
pub fn client_summary(db: &Database, client_id: u64) -> CampaignSummary {
    let mut summary = CampaignSummary {
        client_id,
        campaigns: 0,
        active: 0,
        budget: Decimal::ZERO,
        spend: Decimal::ZERO,
        impressions: 0,
        clicks: 0,
        conversions: 0,
        metrics: metrics(Decimal::ZERO, Decimal::ZERO, 0, 0, 0),
    };
    for campaign in db.campaigns.values().filter(|c| c.client_id == client_id) {
        summary.campaigns += 1;
        if campaign.status == CampaignStatus::Active {
            summary.active += 1;
        }
        summary.budget = summary.budget.saturating_add(campaign.budget);
        summary.spend = summary.spend.saturating_add(campaign.spend);
        summary.impressions = summary.impressions.saturating_add(campaign.impressions);
        summary.clicks = summary.clicks.saturating_add(campaign.clicks);
        summary.conversions = summary.conversions.saturating_add(campaign.conversions);
    }
    summary.metrics = metrics(
        summary.budget,
        summary.spend,
        summary.impressions,
        summary.clicks,
        summary.conversions,
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn metrics_handle_zero_denominators() {
        let empty = metrics(Decimal::ZERO, Decimal::ZERO, 0, 0, 0);
        assert_eq!(empty.ctr, None);
        assert_eq!(empty.cpc, None);
        assert_eq!(empty.cpa, None);
        assert_eq!(empty.budget_used_pct, None);

        let m = metrics(d("1000"), d("250"), 20_000, 400, 8);
        assert_eq!(m.ctr, Some(2.0));
        assert_eq!(m.cpc, Some(d("0.63")));
        assert_eq!(m.cpa, Some(d("31.25")));
        assert_eq!(m.conversion_rate, Some(2.0));
        assert_eq!(m.budget_remaining, d("750"));
        assert_eq!(m.budget_used_pct, Some(25.0));
    }

    #[test]
    fn create_validates_dates_and_amounts() {
        let mut db = Database::default();
        let today = date(2026, 6, 1);
        let bad_range = CampaignInput {
            client_id: Some(1),
            name: Some("Spring".into()),
            start_date: Some(date(2026, 6, 10)),
            end_date: Some(date(2026, 6, 1)),
            ..CampaignInput::default()
        };
        assert_eq!(
            create_campaign(&mut db, bad_range, today).unwrap_err(),
            ValidationError::DateRange
        );

        let negative = CampaignInput {
            client_id: Some(1),
            name: Some("Spring".into()),
            budget: Some(d("-5")),
            ..CampaignInput::default()
        };
        assert_eq!(
            create_campaign(&mut db, negative, today).unwrap_err(),
            ValidationError::Negative("budget")
        );
        assert!(db.campaigns.is_empty());
    }

    #[test]
    fn summary_blends_client_campaigns() {
        let mut db = Database::default();
        let today = date(2026, 6, 1);
        for (client_id, spend, clicks, status) in [
            (1, "100", 50, CampaignStatus::Active),
            (1, "50", 50, CampaignStatus::Completed),
            (2, "999", 1, CampaignStatus::Active),
        ] {
            create_campaign(
                &mut db,
                CampaignInput {
                    client_id: Some(client_id),
                    name: Some("Ads".into()),
                    status: Some(status),
                    budget: Some(d("200")),
                    spend: Some(d(spend)),
                    impressions: Some(1000),
                    clicks: Some(clicks),
                    conversions: Some(3),
                    ..CampaignInput::default()
                },
                today,
            )
            .unwrap();
        }

        let summary = client_summary(&db, 1);
        assert_eq!(summary.campaigns, 2);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.spend, d("150"));
        assert_eq!(summary.clicks, 100);
        assert_eq!(summary.metrics.ctr, Some(5.0));
        assert_eq!(summary.metrics.cpc, Some(d("1.50")));
        assert_eq!(summary.metrics.cpa, Some(d("25")));
        assert_eq!(summary.metrics.budget_used_pct, Some(37.5));

        let query = CampaignQuery {
            client_id: Some(1),
            status: Some(CampaignStatus::Active),
        };
        assert_eq!(list_campaigns(&db, &query).len(), 1);
    }
}
