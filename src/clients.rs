use crate::billing::{money_input, normalize_month};
use crate::errors::ValidationError;
use crate::models::{Client, ClientInput, ClientQuery, ClientStatus, Database};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

pub fn create_client(
    db: &mut Database,
    input: ClientInput,
    today: NaiveDate,
) -> Result<Client, ValidationError> {
    let now = Utc::now();
    let mut client = Client {
        id: 0,
        name: String::new(),
        company: None,
        email: None,
        phone: None,
        address: None,
        status: ClientStatus::Active,
        monthly_rate: Decimal::ZERO,
        billing_day: 1,
        billing_start: crate::billing::month_key(today),
        credit_balance: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    };
    if input.name.is_none() {
        return Err(ValidationError::Empty("name"));
    }
    apply_input(&mut client, input)?;

    client.id = db.next_client_id();
    db.clients.insert(client.id, client.clone());
    Ok(client)
}

/// Applies the fields present in `input`. Nothing is written when any field
/// is invalid.
pub fn apply_input(client: &mut Client, input: ClientInput) -> Result<(), ValidationError> {
    let mut next = client.clone();

    if let Some(name) = input.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty("name"));
        }
        next.name = name.to_string();
    }
    if let Some(company) = input.company {
        next.company = optional(company);
    }
    if let Some(email) = input.email {
        next.email = optional(email);
        if next.email.as_deref().is_some_and(|email| !email.contains('@')) {
            return Err(ValidationError::Email);
        }
    }
    if let Some(phone) = input.phone {
        next.phone = optional(phone);
    }
    if let Some(address) = input.address {
        next.address = optional(address);
    }
    if let Some(status) = input.status {
        next.status = status;
    }
    if let Some(rate) = input.monthly_rate {
        next.monthly_rate = money_input("monthly_rate", rate)?;
    }
    if let Some(day) = input.billing_day {
        if !(1..=28).contains(&day) {
            return Err(ValidationError::BillingDay);
        }
        next.billing_day = day;
    }
    if let Some(start) = input.billing_start {
        next.billing_start = normalize_month(&start)?;
    }

    next.updated_at = Utc::now();
    *client = next;
    Ok(())
}

pub fn search_clients<'a>(db: &'a Database, query: &ClientQuery) -> Vec<&'a Client> {
    let needle = query
        .search
        .as_deref()
        .map(|search| search.trim().to_lowercase())
        .filter(|search| !search.is_empty());

    let mut clients: Vec<&Client> = db
        .clients
        .values()
        .filter(|client| query.status.is_none_or(|status| client.status == status))
        .filter(|client| match &needle {
            Some(needle) => [Some(&client.name), client.company.as_ref(), client.email.as_ref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle)),
            None => true,
        })
        .collect();
    clients.sort_by_key(|client| client.name.to_lowercase());
    clients
}

fn optional(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignInput, Note, TaskInput};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 14).unwrap()
    }

    fn input(name: &str) -> ClientInput {
        ClientInput {
            name: Some(name.to_string()),
            ..ClientInput::default()
        }
    }

    #[test]
    fn create_defaults_billing_start_to_current_month() {
        let mut db = Database::default();
        let client = create_client(&mut db, input(" Acme "), today()).unwrap();
        assert_eq!(client.id, 1);
        assert_eq!(client.name, "Acme");
        assert_eq!(client.billing_start, "2026-05");
        assert_eq!(client.billing_day, 1);
    }

    #[test]
    fn invalid_fields_leave_the_client_untouched() {
        let mut db = Database::default();
        let mut client = create_client(&mut db, input("Acme"), today()).unwrap();

        let bad = ClientInput {
            name: Some("Renamed".into()),
            billing_day: Some(31),
            ..ClientInput::default()
        };
        assert_eq!(apply_input(&mut client, bad).unwrap_err(), ValidationError::BillingDay);
        assert_eq!(client.name, "Acme");

        let bad_email = ClientInput {
            email: Some("nobody".into()),
            ..ClientInput::default()
        };
        assert_eq!(apply_input(&mut client, bad_email).unwrap_err(), ValidationError::Email);

        let negative = ClientInput {
            monthly_rate: Some("-1".parse().unwrap()),
            ..ClientInput::default()
        };
        assert_eq!(
            apply_input(&mut client, negative).unwrap_err(),
            ValidationError::Negative("monthly_rate")
        );
        let huge = ClientInput {
            monthly_rate: Some(Decimal::MAX),
            ..ClientInput::default()
        };
        assert_eq!(
            apply_input(&mut client, huge).unwrap_err(),
            ValidationError::TooLarge("monthly_rate")
        );
        assert_eq!(client.monthly_rate, Decimal::ZERO);
        assert!(create_client(&mut db, ClientInput::default(), today()).is_err());
    }

    #[test]
    fn search_matches_name_company_and_email() {
        let mut db = Database::default();
        create_client(&mut db, input("Zed Bakery"), today()).unwrap();
        let mut with_company = input("Ann");
        with_company.company = Some("Harbor Florist".into());
        create_client(&mut db, with_company, today()).unwrap();
        let mut lead = input("Bo");
        lead.email = Some("bo@harbor.test".into());
        lead.status = Some(ClientStatus::Lead);
        create_client(&mut db, lead, today()).unwrap();

        let query = ClientQuery {
            search: Some("HARBOR".into()),
            status: None,
        };
        let names: Vec<&str> = search_clients(&db, &query).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bo"]);

        let leads = ClientQuery {
            search: None,
            status: Some(ClientStatus::Lead),
        };
        assert_eq!(search_clients(&db, &leads).len(), 1);
    }

    #[test]
    fn removing_a_client_drops_its_records_and_unlinks_tasks() {
        let mut db = Database::default();
        let mut acme = input("Acme");
        acme.monthly_rate = Some("100".parse().unwrap());
        acme.billing_start = Some("2026-05".into());
        let acme = create_client(&mut db, acme, today()).unwrap().id;
        let mut other = input("Other");
        other.monthly_rate = Some("50".parse().unwrap());
        other.billing_start = Some("2026-05".into());
        let other = create_client(&mut db, other, today()).unwrap().id;

        crate::billing::generate_invoices(&mut db, "2026-05", today()).unwrap();
        for client_id in [acme, other] {
            let payment = crate::billing::PaymentInput {
                amount: "20".parse().unwrap(),
                ..Default::default()
            };
            crate::billing::record_payment(&mut db, client_id, payment, today()).unwrap();
            let campaign = CampaignInput {
                client_id: Some(client_id),
                name: Some("Spring".into()),
                ..CampaignInput::default()
            };
            crate::campaigns::create_campaign(&mut db, campaign, today()).unwrap();
            let id = db.next_note_id();
            db.notes.insert(
                id,
                Note {
                    id,
                    client_id,
                    body: "Prefers email".into(),
                    pinned: false,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            );
        }
        let linked = TaskInput {
            title: Some("Kickoff".into()),
            client_id: Some(Some(acme)),
            ..TaskInput::default()
        };
        let task = crate::tasks::create_task(&mut db, linked, Utc::now()).unwrap().id;

        let removed = db.remove_client(acme).unwrap();
        assert_eq!(removed.name, "Acme");
        assert!(db.billing.values().all(|record| record.client_id == other));
        assert!(db.payments.values().all(|payment| payment.client_id == other));
        assert!(db.campaigns.values().all(|campaign| campaign.client_id == other));
        assert!(db.notes.values().all(|note| note.client_id == other));
        assert_eq!(
            (db.billing.len(), db.payments.len(), db.campaigns.len(), db.notes.len()),
            (1, 1, 1, 1)
        );
        assert_eq!(db.tasks[&task].client_id, None);
        assert!(db.remove_client(acme).is_none());
    }
}
