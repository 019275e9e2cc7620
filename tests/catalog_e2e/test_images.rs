//! E2E tests: image creation, listing and deletion.

use annotation_catalog::db::directory::{self, placeholder};
use serde_json::json;

use super::test_helpers::*;

/// (1) Created image round-trips with nested annotations ordered by index.
#[actix_rt::test]
async fn test_create_image_round_trip() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let mut body = image_json("img-1");
    body["hardware_id"] = json!("cam-7");
    body["ml_tag"] = json!("TRAIN");
    body["annotations"] = json!([annotation_json(2, "scalpel"), annotation_json(1, "clamp")]);

    let created = create_image(&app, &body).await;
    assert_eq!(created["image_key"], "img-1");
    assert_eq!(created["client_id"], "client-1");
    assert_eq!(created["hardware_id"], "cam-7");
    assert_eq!(created["ml_tag"], "TRAIN");
    assert_eq!(created["has_file"], false);
    assert_eq!(created["annotations"][0]["index"], 1);
    assert_eq!(created["annotations"][1]["index"], 2);

    let (status, list) = get_json(&app, "/api/v1/images").await;
    assert_eq!(status, 200);
    let images = list.as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["image_key"], "img-1");
    assert_eq!(images[0]["created_at"], "2024-01-01T00:00:00Z");
    assert_eq!(images[0]["annotations"][0]["instrument"], "clamp");
    assert_eq!(
        images[0]["annotations"][1]["polygon"]["points"],
        json!([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
    );
}

/// (2) Creating an existing key is a conflict and leaves the original untouched.
#[actix_rt::test]
async fn test_create_duplicate_image_conflicts() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    create_image(&app, &image_json("dup")).await;

    let mut second = image_json("dup");
    second["client_id"] = json!("client-2");
    second["annotations"] = json!([annotation_json(1, "clamp")]);

    let (status, body) = post_json(&app, "/api/v1/images", &second).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "CONFLICT");

    let (_, list) = get_json(&app, "/api/v1/images").await;
    assert_eq!(list[0]["client_id"], "client-1");
    assert_eq!(list[0]["annotations"], json!([]));
}

/// (3) Unknown location and user ids get placeholder rows, created once.
#[actix_rt::test]
async fn test_unknown_references_are_provisioned() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let mut body = image_json("img-ref");
    body["location_id"] = json!("loc-1");
    body["user_id"] = json!("user-1");
    create_image(&app, &body).await;

    let conn = ctx.pool.connection();
    let location = directory::find_location(conn, "loc-1")
        .await
        .unwrap()
        .expect("location should be provisioned");
    assert_eq!(location.address, placeholder::LOCATION_ADDRESS);
    assert_eq!(location.country, placeholder::LOCATION_COUNTRY);
    assert_eq!(location.town, placeholder::LOCATION_TOWN);

    let user = directory::find_user(conn, "user-1")
        .await
        .unwrap()
        .expect("user should be provisioned");
    assert_eq!(user.first_name, placeholder::USER_FIRST_NAME);
    assert_eq!(user.last_name, placeholder::USER_LAST_NAME);
    assert_eq!(user.role, placeholder::USER_ROLE);

    // Second reference reuses the existing rows
    let mut other = image_json("img-ref-2");
    other["location_id"] = json!("loc-1");
    other["user_id"] = json!("user-1");
    create_image(&app, &other).await;

    assert!(!directory::ensure_location(conn, "loc-1").await.unwrap());
    assert!(!directory::ensure_user(conn, "user-1").await.unwrap());
}

/// (4) Duplicate inline indices are rejected and nothing is stored.
#[actix_rt::test]
async fn test_duplicate_inline_indices_rejected() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let mut body = image_json("img-dup-idx");
    body["location_id"] = json!("loc-x");
    body["annotations"] = json!([annotation_json(1, "a"), annotation_json(1, "b")]);

    let (status, resp) = post_json(&app, "/api/v1/images", &body).await;
    assert_eq!(status, 400);
    assert_eq!(resp["error"], "INVALID_INPUT");

    let (_, list) = get_json(&app, "/api/v1/images").await;
    assert_eq!(list, json!([]));
    assert!(
        directory::find_location(ctx.pool.connection(), "loc-x")
            .await
            .unwrap()
            .is_none()
    );
}

/// (5) Malformed metadata is a 400 with the standard error body.
#[actix_rt::test]
async fn test_invalid_image_metadata() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let mut bad_tag = image_json("img-tag");
    bad_tag["ml_tag"] = json!("VALIDATION");
    let (status, body) = post_json(&app, "/api/v1/images", &bad_tag).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");

    let missing_client = json!({"image_key": "x", "created_at": "2024-01-01T00:00:00Z"});
    let (status, _) = post_json(&app, "/api/v1/images", &missing_client).await;
    assert_eq!(status, 400);

    let (status, _) = post_json(&app, "/api/v1/images", &image_json("")).await;
    assert_eq!(status, 400);

    let mut bad_time = image_json("img-time");
    bad_time["created_at"] = json!("yesterday");
    let (status, _) = post_json(&app, "/api/v1/images", &bad_time).await;
    assert_eq!(status, 400);
}

/// (6) List filters combine with AND and match any of their ids.
#[actix_rt::test]
async fn test_list_filters() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let fixtures = [
        ("a", "u1", "l1", vec![(1, "clamp"), (2, "clamp"), (3, "scalpel")]),
        ("b", "u2", "l1", vec![(1, "scalpel")]),
        ("c", "u1", "l2", vec![]),
    ];
    for (key, user, location, annotations) in fixtures {
        let mut body = image_json(key);
        body["user_id"] = json!(user);
        body["location_id"] = json!(location);
        body["annotations"] = json!(
            annotations
                .iter()
                .map(|(i, inst)| annotation_json(*i, inst))
                .collect::<Vec<_>>()
        );
        create_image(&app, &body).await;
    }

    let keys = |list: &serde_json::Value| -> Vec<String> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|i| i["image_key"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, all) = get_json(&app, "/api/v1/images").await;
    assert_eq!(keys(&all), ["a", "b", "c"]);

    let (_, by_user) = get_json(&app, "/api/v1/images?user_ids=u1").await;
    assert_eq!(keys(&by_user), ["a", "c"]);

    let (_, by_location) = get_json(&app, "/api/v1/images?location_ids[]=l1").await;
    assert_eq!(keys(&by_location), ["a", "b"]);

    // Image "a" has two clamp annotations but appears once, with all its annotations
    let (_, by_instrument) = get_json(&app, "/api/v1/images?instrument_ids=clamp").await;
    assert_eq!(keys(&by_instrument), ["a"]);
    assert_eq!(by_instrument[0]["annotations"].as_array().unwrap().len(), 3);

    let (_, any_instrument) = get_json(
        &app,
        "/api/v1/images?instrument_ids=clamp&instrument_ids=scalpel",
    )
    .await;
    assert_eq!(keys(&any_instrument), ["a", "b"]);

    let (_, combined) = get_json(
        &app,
        "/api/v1/images?user_ids=u1&user_ids=u2&location_ids=l1&instrument_ids=scalpel",
    )
    .await;
    assert_eq!(keys(&combined), ["a", "b"]);

    let (_, none) = get_json(&app, "/api/v1/images?user_ids=nobody").await;
    assert_eq!(none, json!([]));

    let (_, empty_value) = get_json(&app, "/api/v1/images?user_ids=").await;
    assert_eq!(keys(&empty_value), ["a", "b", "c"]);
}

/// (7) Deleting an image deletes its annotations.
#[actix_rt::test]
async fn test_delete_image_cascades() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let mut body = image_json("gone");
    body["annotations"] = json!([annotation_json(1, "a"), annotation_json(2, "b")]);
    create_image(&app, &body).await;
    create_image(&app, &image_json("kept")).await;

    let (status, resp) = delete(&app, "/api/v1/images/gone").await;
    assert_eq!(status, 200);
    assert_eq!(resp["image_key"], "gone");
    assert_eq!(resp["annotations_deleted"], 2);

    let (status, _) = get_json(&app, "/api/v1/images/gone/annotations").await;
    assert_eq!(status, 404);

    let (_, list) = get_json(&app, "/api/v1/images?instrument_ids=a").await;
    assert_eq!(list, json!([]));

    let (status, body) = delete(&app, "/api/v1/images/gone").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");

    let (_, list) = get_json(&app, "/api/v1/images").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

/// (8) Liveness and readiness probes answer under the API scope.
#[actix_rt::test]
async fn test_health_endpoints() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let (status, body) = get_json(&app, "/api/v1/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get_json(&app, "/api/v1/ready").await;
    assert_eq!(status, 200);
    assert_eq!(body["database"], "connected");
}

/// (9) The documented create-then-repeat scenario.
#[actix_rt::test]
async fn test_create_then_repeat_scenario() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let body = json!({
        "image_key": "k1",
        "client_id": "c1",
        "created_at": "2025-01-01T00:00:00Z",
        "annotations": [
            {"index": 0, "instrument": "i1", "polygon": {"points": [[0, 0], [1, 1]]}}
        ]
    });

    let (status, created) = post_json(&app, "/api/v1/images", &body).await;
    assert_eq!(status, 200);
    assert_eq!(created["image_key"], "k1");
    assert_eq!(created["annotations"].as_array().unwrap().len(), 1);
    assert_eq!(created["annotations"][0]["index"], 0);

    let (status, _) = post_json(&app, "/api/v1/images", &body).await;
    assert_eq!(status, 409);
}

/// (10) Catalog routes answer at the server root and under /api/v1 alike.
#[actix_rt::test]
async fn test_routes_served_at_root() {
    let ctx = setup().await;
    let app = create_test_app(&ctx).await;

    let mut body = image_json("root-img");
    body["annotations"] = json!([annotation_json(1, "clamp")]);
    let (status, created) = post_json(&app, "/images", &body).await;
    assert_eq!(status, 200, "create at root failed: {}", created);

    let (status, list) = get_json(&app, "/images").await;
    assert_eq!(status, 200);
    assert_eq!(list[0]["image_key"], "root-img");

    let (status, _) = post_json(
        &app,
        "/images/root-img/annotations",
        &annotation_json(2, "scalpel"),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = put_json(
        &app,
        "/images/root-img/annotations/2",
        &json!({"instrument": "forceps", "polygon": {"points": []}}),
    )
    .await;
    assert_eq!(status, 200);

    let (status, annotations) = get_json(&app, "/api/v1/images/root-img/annotations").await;
    assert_eq!(status, 200);
    assert_eq!(annotations[1]["instrument"], "forceps");

    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, 200);

    let (status, resp) = delete(&app, "/images/root-img").await;
    assert_eq!(status, 200);
    assert_eq!(resp["annotations_deleted"], 2);
}
