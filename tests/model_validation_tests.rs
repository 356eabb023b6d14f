use chrono::Utc;
use print_catalog::{
    error::AppError,
    handlers::validate_new_model,
    models::{Category, CreateModelRequest, Model, ModelRow, NewModel, Session, SessionUser},
};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

// --- Model (remote row shape) ---

#[test]
fn test_model_reads_camel_case_date_and_defaults() {
    // Seeded rows have no owner; likes may be omitted by a narrow select.
    let model: Model = serde_json::from_value(json!({
        "id": 12,
        "name": "Articulated Dragon",
        "category": "toys-games",
        "dateAdded": "2024-03-02T10:00:00Z"
    }))
    .unwrap();

    assert_eq!(model.id, 12);
    assert_eq!(model.category, Category::ToysGames);
    assert_eq!(model.user_id, None);
    assert_eq!(model.description, None);
    assert_eq!(model.likes, 0);
    assert_eq!(model.date_added.to_rfc3339(), "2024-03-02T10:00:00+00:00");
}

#[test]
fn test_model_with_unknown_category_does_not_decode() {
    let result = serde_json::from_value::<Model>(json!({
        "id": 1,
        "name": "Lamp",
        "category": "lighting",
        "dateAdded": "2024-03-02T10:00:00Z"
    }));
    assert!(result.is_err());
}

#[test]
fn test_owned_row_serializes_owner_but_no_server_fields() {
    let owner = Uuid::new_v4();
    let row = ModelRow::owned_by(
        NewModel {
            name: "Hook".to_string(),
            description: None,
            image: None,
            category: Category::Household,
            date_added: Utc::now(),
        },
        owner,
    );

    let value = serde_json::to_value(&row).unwrap();
    assert_eq!(value["user_id"], owner.to_string());
    assert!(value.get("dateAdded").is_some());
    assert!(value.get("date_added").is_none());
    assert!(value.get("id").is_none());
    assert!(value.get("likes").is_none());
}

// --- Category ---

#[test]
fn test_category_wire_values() {
    assert_eq!(
        serde_json::to_value(Category::ThreeDPrinter).unwrap(),
        json!("3d-printer")
    );
    assert_eq!(
        serde_json::to_value(Category::PropsCosplay).unwrap(),
        json!("props-cosplay")
    );
    for category in Category::ALL {
        let wire = serde_json::to_value(category).unwrap();
        assert_eq!(wire, json!(category.as_str()));
        assert_eq!(Category::from_str(category.as_str()), Ok(category));
    }
}

#[test]
fn test_category_labels() {
    assert_eq!(Category::ToysGames.label(), "Toys Games");
    assert_eq!(Category::HobbyDiy.label(), "Hobby Diy");
    assert_eq!(Category::Art.label(), "Art");
}

#[test]
fn test_unknown_category_is_rejected() {
    assert_eq!(
        Category::from_str("Toys-Games"),
        Err("unknown category 'Toys-Games'".to_string())
    );
}

// --- Create form validation ---

fn form(title: &str, category: &str) -> CreateModelRequest {
    CreateModelRequest {
        title: title.to_string(),
        category: category.to_string(),
        ..CreateModelRequest::default()
    }
}

#[test]
fn test_validate_trims_and_drops_blank_optionals() {
    let before = Utc::now();
    let new = validate_new_model(CreateModelRequest {
        title: "  Planter  ".to_string(),
        category: "household".to_string(),
        description: Some("  Self-watering  ".to_string()),
        image: Some("".to_string()),
    })
    .unwrap();

    assert_eq!(new.name, "Planter");
    assert_eq!(new.category, Category::Household);
    assert_eq!(new.description.as_deref(), Some("Self-watering"));
    assert_eq!(new.image, None);
    assert!(new.date_added >= before);
}

#[test]
fn test_validate_requires_title_and_category() {
    for (title, category) in [("", "art"), ("   ", "art"), ("Vase", ""), ("Vase", "  ")] {
        let err = validate_new_model(form(title, category)).unwrap_err();
        assert!(
            matches!(&err, AppError::BadRequest(msg) if msg == "Title and category are required"),
            "title {:?} category {:?} gave {:?}",
            title,
            category,
            err
        );
    }
}

#[test]
fn test_validate_rejects_category_outside_fixed_set() {
    let err = validate_new_model(form("Vase", "pottery")).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("pottery")));
}

// --- Session ---

#[test]
fn test_session_decodes_token_grant_response() {
    let session: Session = serde_json::from_value(json!({
        "access_token": "jwt",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1_700_003_600,
        "refresh_token": "r1",
        "user": { "id": "00000000-0000-0000-0000-000000000001", "email": "a@b.c", "role": "authenticated" }
    }))
    .unwrap();

    assert_eq!(
        session.user,
        SessionUser {
            id: Uuid::from_u128(1),
            email: Some("a@b.c".to_string())
        }
    );
    assert!(!session.expires_within(1_700_000_000, 60));
    assert!(session.expires_within(1_700_003_550, 60));
}
