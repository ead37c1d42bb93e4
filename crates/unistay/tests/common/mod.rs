#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::json;
use unistay::availability::MalformedDatePolicy;
use unistay::backend::{encode_row, DataService, SharedDataService, Table};
use unistay::domain::{
    AmenityId, LandlordProfileInput, PropertyDraft, StudentProfileInput, UniversityId, UserRole,
};
use unistay::repository::Repositories;
use unistay::session::Session;
use unistay::viewmodel::{LandlordProfileViewModel, RegisterViewModel, StudentProfileViewModel};

pub struct Campus {
    pub repos: Repositories,
    pub university: UniversityId,
    pub wifi: AmenityId,
    pub student: Session,
    pub landlord: Session,
}

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, month, day).expect("valid date")
}

async fn insert(service: &SharedDataService, table: Table, value: serde_json::Value) -> String {
    let row = service
        .insert(table, encode_row(&value).expect("row"))
        .await
        .expect("insert");
    row["id"].as_str().expect("id").to_string()
}

/// A university, one amenity, and a student and landlord who both finished
/// onboarding through the profile screens.
pub async fn campus(service: SharedDataService, policy: MalformedDatePolicy) -> Campus {
    let university = UniversityId::new(
        insert(
            &service,
            Table::Universities,
            json!({
                "name": "Uppsala University",
                "city": "Uppsala",
                "latitude": 59.8498,
                "longitude": 17.6297,
            }),
        )
        .await,
    );
    let wifi = AmenityId::new(
        insert(&service, Table::Amenities, json!({ "name": "Wi-Fi", "icon": "wifi" })).await,
    );
    let repos = Repositories::new(service, policy);

    let register = RegisterViewModel::new(repos.clone());
    let mut student = register
        .register("maja@student.uu.se", "Maja Lind", UserRole::Student)
        .await
        .expect("student account");
    let saved = StudentProfileViewModel::new(repos.clone())
        .save(
            &mut student,
            StudentProfileInput {
                university_id: Some(university.clone()),
                budget_min: Some(400.0),
                budget_max: Some(900.0),
                major: Some("Biology".to_string()),
                year_of_study: Some(2),
                phone: None,
            },
        )
        .await;
    assert!(saved, "student profile saved");

    let mut landlord = register
        .register("olof@fastighet.se", "Olof Berg", UserRole::Landlord)
        .await
        .expect("landlord account");
    let saved = LandlordProfileViewModel::new(repos.clone())
        .save(
            &mut landlord,
            LandlordProfileInput {
                company_name: Some("Berg Fastigheter".to_string()),
                phone: Some("018-555 12 34".to_string()),
            },
        )
        .await;
    assert!(saved, "landlord profile saved");

    Campus {
        repos,
        university,
        wifi,
        student,
        landlord,
    }
}

pub fn studio(campus: &Campus) -> PropertyDraft {
    PropertyDraft {
        title: "Studio by Svandammen".to_string(),
        description: Some("Furnished studio, five minutes from campus.".to_string()),
        address: "Kyrkogårdsgatan 7".to_string(),
        city: "Uppsala".to_string(),
        latitude: Some(59.8530),
        longitude: Some(17.6330),
        price_per_month: 750.0,
        deposit: Some(750.0),
        bedrooms: 1,
        bathrooms: 1,
        max_occupants: 1,
        available_from: None,
        available_to: None,
        university_id: Some(campus.university.clone()),
        image_urls: vec!["https://img.example/studio.jpg".to_string()],
        amenity_ids: vec![campus.wifi.clone()],
    }
}
