//! HTTP tests: the full router over the in-memory store.
//!
//! Time is pinned at 2024-05-20T09:00:00Z (UTC calendar), so "today" is
//! 2024-05-20 for every booking below.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{Value, json};
use stayhub::config::Config;
use stayhub::persistence::{MemoryStore, Repositories};
use stayhub::{AppState, build_router};
use stayhub_testing::test_clock;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let repositories = Repositories::from_store(Arc::new(MemoryStore::new()));
        let state = AppState::new(repositories, config, Arc::new(test_clock()));
        Self {
            router: build_router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Jwt", token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Sign up `username` and return a token for it.
    async fn user(&self, username: &str) -> String {
        let (status, _) = self
            .call(
                Method::POST,
                "/api/v1/users",
                None,
                Some(json!({
                    "username": username,
                    "name": username,
                    "email": format!("{username}@example.com"),
                    "password": "pass-word-1",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/users/log-in",
                None,
                Some(json!({"username": username, "password": "pass-word-1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn category(&self, token: &str, kind: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/categories",
                token,
                json!({"name": format!("{kind} category"), "kind": kind}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["pk"].as_i64().unwrap()
    }

    async fn room(&self, token: &str) -> i64 {
        let category = self.category(token, "rooms").await;
        let (status, body) = self
            .post("/api/v1/rooms", token, room_body(category, &[]))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["pk"].as_i64().unwrap()
    }

    async fn experience(&self, token: &str, max_team: i32) -> i64 {
        let category = self.category(token, "experiences").await;
        let (status, body) = self
            .post(
                "/api/v1/experiences",
                token,
                json!({
                    "name": "Night market tour",
                    "country": "Korea",
                    "city": "Seoul",
                    "price": 40,
                    "address": "Gwangjang Market",
                    "start": "18:00:00",
                    "end": "21:00:00",
                    "experience_max_team": max_team,
                    "category": category,
                    "perks": [],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["pk"].as_i64().unwrap()
    }
}

fn room_body(category: i64, amenities: &[i64]) -> Value {
    json!({
        "name": "Hanok stay",
        "country": "Korea",
        "city": "Seoul",
        "price": 120,
        "rooms": 2,
        "toilets": 1,
        "description": "Quiet courtyard",
        "address": "12 Bukchon-ro",
        "pet_friendly": true,
        "kind": "entire_place",
        "category": category,
        "amenities": amenities,
    })
}

fn stay(check_in: &str, check_out: &str) -> Value {
    json!({"check_in": check_in, "check_out": check_out, "guests": 2})
}

// ============================================================================
// Room bookings
// ============================================================================

#[tokio::test]
async fn test_room_booking_overlap_and_adjacency() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let room = app.room(&host).await;
    let bookings = format!("/api/v1/rooms/{room}/bookings");

    let (status, body) = app.post(&bookings, &guest, stay("2024-06-01", "2024-06-05")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["check_in"], "2024-06-01");
    assert_eq!(body["check_out"], "2024-06-05");
    assert_eq!(body["experience_time"], Value::Null);
    assert_eq!(body["guests"], 2);

    // Shares 2024-06-05 with the first stay
    let (status, body) = app.post(&bookings, &guest, stay("2024-06-05", "2024-06-07")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert!(body["fields"]["non_field_errors"].is_array());

    let (status, _) = app.post(&bookings, &guest, stay("2024-06-06", "2024-06-08")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get(&bookings, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_room_booking_validation() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let room = app.room(&host).await;
    let bookings = format!("/api/v1/rooms/{room}/bookings");

    let (status, body) = app.post(&bookings, &host, stay("2024-05-01", "2024-06-05")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["fields"]["check_in"].is_array());

    let (status, _) = app.post(&bookings, &host, stay("2024-06-05", "2024-06-05")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            &bookings,
            &host,
            json!({"check_in": "2024-06-01", "check_out": "2024-06-03", "guests": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Today is still bookable
    let (status, _) = app.post(&bookings, &host, stay("2024-05-20", "2024-05-21")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post("/api/v1/rooms/999/bookings", &host, stay("2024-06-01", "2024-06-02"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_booking_body_is_field_attributed() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let room = app.room(&host).await;
    let bookings = format!("/api/v1/rooms/{room}/bookings");

    let (status, body) = app
        .post(
            &bookings,
            &host,
            json!({"check_in": "2024-13-40", "check_out": "2024-06-05", "guests": 2}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["fields"]["check_in"].is_array(), "{body}");

    let (status, body) = app
        .post(
            &bookings,
            &host,
            json!({"check_in": "2024-06-01", "check_out": "2024-06-05"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"]["guests"][0], "This field is required.");

    let (status, body) = app
        .post(
            &bookings,
            &host,
            json!({"check_in": "2024-06-01", "check_out": "2024-06-05", "guests": 3_000_000_000_i64}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["guests"].is_array(), "{body}");

    let (status, body) = app.get(&bookings, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_revise_and_cancel_room_booking() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let stranger = app.user("stranger").await;
    let room = app.room(&host).await;
    let bookings = format!("/api/v1/rooms/{room}/bookings");

    let (_, first) = app.post(&bookings, &guest, stay("2024-06-01", "2024-06-05")).await;
    let (_, second) = app.post(&bookings, &guest, stay("2024-06-10", "2024-06-12")).await;
    let first = format!("{bookings}/{}", first["pk"]);
    let second = format!("{bookings}/{}", second["pk"]);

    // Moving within its own dates does not conflict with itself
    let (status, body) = app.put(&first, &guest, json!({"check_out": "2024-06-04"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["check_in"], "2024-06-01");
    assert_eq!(body["check_out"], "2024-06-04");

    let (status, _) = app.put(&first, &guest, json!({"check_out": "2024-06-10"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.put(&first, &stranger, json!({"guests": 3})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&second, &stranger).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The room owner may cancel a guest's booking
    let (status, _) = app.delete(&second, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&second, &host).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(&bookings, None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_owner_clears_upcoming_bookings() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let room = app.room(&host).await;
    let bookings = format!("/api/v1/rooms/{room}/bookings");

    app.post(&bookings, &guest, stay("2024-06-01", "2024-06-05")).await;

    let (status, _) = app.delete(&bookings, &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&bookings, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get(&bookings, None).await;
    assert!(body.as_array().unwrap().is_empty());
}

// ============================================================================
// Experience bookings
// ============================================================================

#[tokio::test]
async fn test_experience_capacity_at_exact_time() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let experience = app.experience(&host, 2).await;
    let bookings = format!("/api/v1/experiences/{experience}/bookings");
    let slot = json!({"experience_time": "2024-06-01T18:00:00Z", "guests": 2});

    let (status, body) = app.post(&bookings, &guest, slot.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["check_in"], Value::Null);
    assert_eq!(body["experience_time"], "2024-06-01T18:00:00Z");

    let (status, _) = app.post(&bookings, &host, slot.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post(&bookings, &guest, slot).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["fields"]["experience_time"].is_array());

    // One second later is a different slot
    let (status, _) = app
        .post(
            &bookings,
            &guest,
            json!({"experience_time": "2024-06-01T18:00:01Z", "guests": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            &bookings,
            &guest,
            json!({"experience_time": "2024-05-20T08:59:59Z", "guests": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["experience_time"].is_array());
}

#[tokio::test]
async fn test_experience_booking_revision_keeps_its_own_seat() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let experience = app.experience(&host, 1).await;
    let bookings = format!("/api/v1/experiences/{experience}/bookings");

    let (_, booking) = app
        .post(
            &bookings,
            &guest,
            json!({"experience_time": "2024-06-01T18:00:00Z", "guests": 2}),
        )
        .await;
    let booking = format!("{bookings}/{}", booking["pk"]);

    let (status, body) = app.put(&booking, &guest, json!({"guests": 4})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guests"], 4);

    let (status, _) = app.put(&booking, &host, json!({"guests": 1})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Cross-listing access reads as not found
    let other = app.experience(&host, 3).await;
    let (status, _) = app
        .put(
            &format!("/api/v1/experiences/{other}/bookings/{}", body["pk"]),
            &guest,
            json!({"guests": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&booking, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ============================================================================
// Listings
// ============================================================================

#[tokio::test]
async fn test_room_create_requires_a_rooms_category() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let experiences = app.category(&host, "experiences").await;

    let mut missing = room_body(0, &[]);
    missing.as_object_mut().unwrap().remove("category");
    let (status, body) = app.post("/api/v1/rooms", &host, missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["category"].is_array());

    let (status, _) = app.post("/api/v1/rooms", &host, room_body(experiences, &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/api/v1/rooms", &host, room_body(404, &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_room_create_with_unknown_amenity_creates_nothing() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let category = app.category(&host, "rooms").await;
    let (_, wifi) = app
        .post("/api/v1/amenities", &host, json!({"name": "Wifi"}))
        .await;
    let wifi = wifi["pk"].as_i64().unwrap();

    let (status, _) = app
        .post("/api/v1/rooms", &host, room_body(category, &[wifi, 999]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, rooms) = app.get("/api/v1/rooms", None).await;
    assert!(rooms.as_array().unwrap().is_empty());

    let (status, room) = app
        .post("/api/v1/rooms", &host, room_body(category, &[wifi]))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["amenities"][0]["name"], "Wifi");
    assert_eq!(room["owner"]["username"], "host");
    assert_eq!(room["category"]["kind"], "rooms");
    assert_eq!(room["is_owner"], true);
}

#[tokio::test]
async fn test_room_permissions() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let room = app.room(&host).await;
    let uri = format!("/api/v1/rooms/{room}");

    let (status, _) = app
        .call(Method::POST, "/api/v1/rooms", None, Some(room_body(1, &[])))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.put(&uri, &guest, json!({"price": 1})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.put(&uri, &host, json!({"price": 99})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 99);
    assert_eq!(body["name"], "Hanok stay");

    let (status, body) = app.get(&uri, Some(&guest)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_owner"], false);

    let (status, _) = app.delete(&uri, &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reviews_are_paginated_and_rated() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let room = app.room(&host).await;
    let reviews = format!("/api/v1/rooms/{room}/reviews");

    for rating in [5, 4, 3, 4] {
        let (status, body) = app
            .post(&reviews, &guest, json!({"payload": "Lovely", "rating": rating}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "guest");
    }

    let (status, _) = app
        .post(&reviews, &guest, json!({"payload": "Lovely", "rating": 6}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, first) = app.get(&reviews, None).await;
    assert_eq!(first.as_array().unwrap().len(), 3);
    assert_eq!(first[0]["rating"], 4);

    let (_, second) = app.get(&format!("{reviews}?page=2"), None).await;
    assert_eq!(second.as_array().unwrap().len(), 1);
    assert_eq!(second[0]["rating"], 5);

    let (_, fallback) = app.get(&format!("{reviews}?page=abc"), None).await;
    assert_eq!(fallback, first);

    let (_, encoded) = app.get(&format!("{reviews}?page=%32"), None).await;
    assert_eq!(encoded, second);

    let (_, detail) = app.get(&format!("/api/v1/rooms/{room}"), None).await;
    assert_eq!(detail["rating"], 4.0);
}

#[tokio::test]
async fn test_media_belongs_to_the_listing_administrator() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let experience = app.experience(&host, 2).await;

    let (status, _) = app
        .post(
            &format!("/api/v1/experiences/{experience}/photos"),
            &guest,
            json!({"file": "https://cdn.example.com/a.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, photo) = app
        .post(
            &format!("/api/v1/experiences/{experience}/photos"),
            &host,
            json!({"file": "https://cdn.example.com/a.jpg", "description": "Stalls"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let video_uri = format!("/api/v1/experiences/{experience}/video");
    app.put(&video_uri, &host, json!({"file": "https://cdn.example.com/1.mp4"}))
        .await;
    let (status, video) = app
        .put(&video_uri, &host, json!({"file": "https://cdn.example.com/2.mp4"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = app.get(&format!("/api/v1/experiences/{experience}"), None).await;
    assert_eq!(detail["video"]["file"], "https://cdn.example.com/2.mp4");
    assert_eq!(detail["photos"].as_array().unwrap().len(), 1);

    let photo_uri = format!("/api/v1/medias/photos/{}", photo["pk"]);
    let (status, _) = app.delete(&photo_uri, &guest).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&photo_uri, &host).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete(&format!("/api/v1/medias/videos/{}", video["pk"]), &host)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// ============================================================================
// Wishlists
// ============================================================================

#[tokio::test]
async fn test_wishlist_toggle_and_is_liked() {
    let app = TestApp::new();
    let host = app.user("host").await;
    let guest = app.user("guest").await;
    let room = app.room(&host).await;

    let (status, wishlist) = app
        .post("/api/v1/wishlists", &guest, json!({"name": "Summer"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let toggle = format!("/api/v1/wishlists/{}/rooms/{room}", wishlist["pk"]);

    let (status, body) = app.put(&toggle, &guest, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rooms"][0]["pk"], room);

    let (_, detail) = app.get(&format!("/api/v1/rooms/{room}"), Some(&guest)).await;
    assert_eq!(detail["is_liked"], true);
    let (_, detail) = app.get(&format!("/api/v1/rooms/{room}"), Some(&host)).await;
    assert_eq!(detail["is_liked"], false);

    let (_, body) = app.put(&toggle, &guest, json!({})).await;
    assert!(body["rooms"].as_array().unwrap().is_empty());

    // Someone else's wishlist does not exist for the host
    let (status, _) = app.put(&toggle, &host, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = app.get("/api/v1/wishlists", Some(&host)).await;
    assert!(mine.as_array().unwrap().is_empty());
}

// ============================================================================
// Users & authentication
// ============================================================================

#[tokio::test]
async fn test_sign_up_log_in_and_profile() {
    let app = TestApp::new();
    let token = app.user("mina").await;

    let (status, me) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "mina");
    assert!(me.get("password_hash").is_none());

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({"username": "mina", "password": "other"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["username"].is_array());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/users/log-in",
            None,
            Some(json!({"username": "mina", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, public) = app.get("/api/v1/users/mina", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(public.get("email").is_none());

    let (status, _) = app.get("/api/v1/users/me", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let token = app.user("mina").await;

    let (status, _) = app
        .put(
            "/api/v1/users/change-password",
            &token,
            json!({"old_password": "nope", "new_password": "fresh-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            "/api/v1/users/change-password",
            &token,
            json!({"old_password": "pass-word-1", "new_password": "fresh-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/users/log-in",
            None,
            Some(json!({"username": "mina", "password": "fresh-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_trust_me_header_only_when_enabled() {
    let request = || {
        Request::builder()
            .uri("/api/v1/users/me")
            .header("Trust-Me", "mina")
            .body(Body::empty())
            .unwrap()
    };

    let closed = TestApp::new();
    closed.user("mina").await;
    let (status, _) = closed.send(request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut config = Config::default();
    config.auth.allow_trust_me_header = true;
    let open = TestApp::with_config(config);
    open.user("mina").await;
    let (status, me) = open.send(request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "mina");
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["checks"][0]["component"], "memory");
}
