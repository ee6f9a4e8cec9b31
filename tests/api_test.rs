// End-to-end pass over the JSON API against a real listener.
use kindling::config::Config;
use kindling::state::AppState;
use kindling::{app, db};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn spawn_app() -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();

    let state = AppState {
        db: pool,
        config: Config::default(),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    (tmp, format!("http://{}", addr))
}

async fn create_user(client: &reqwest::Client, base: &str, username: &str) -> String {
    let resp = client
        .post(format!("{base}/api/users"))
        .json(&json!({ "username": username }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    resp.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn full_post_comment_like_flow() {
    let (_tmp, base) = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "alice").await;
    let bob = create_user(&client, &base, "bob").await;

    // Alice posts.
    let resp = client
        .post(format!("{base}/api/posts"))
        .json(&json!({ "user_id": alice, "content": "hello world" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let post: Value = resp.json().await.unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();

    // Bob replies, then replies to his own reply.
    let resp = client
        .post(format!("{base}/api/comments"))
        .json(&json!({ "post_id": post_id, "user_id": bob, "content": "nice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let root_comment: Value = resp.json().await.unwrap();
    let root_id = root_comment["id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{base}/api/comments"))
        .json(&json!({
            "post_id": post_id,
            "user_id": bob,
            "parent_id": root_id,
            "content": "nice again"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(resp.json::<Value>().await.unwrap()["depth"], 1);

    // Bob likes the post twice; only the first counts.
    let like_url = format!("{base}/api/posts/{post_id}/like");
    let resp = client
        .post(&like_url)
        .json(&json!({ "user_id": bob }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap()["created"], true);
    let resp = client
        .post(&like_url)
        .json(&json!({ "user_id": bob }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap()["created"], false);

    // The post detail carries the counter and the nested tree.
    let detail: Value = client
        .get(format!("{base}/api/posts/{post_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["like_count"], 1);
    assert_eq!(detail["author"], "alice");
    let tree = detail["comments"].as_array().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0]["author"], "bob");
    assert_eq!(tree[0]["replies"][0]["content"], "nice again");

    // The listing carries the author name and counts from one query.
    let list: Value = client
        .get(format!("{base}/api/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["author"], "alice");
    assert_eq!(list[0]["comment_count"], 2);
    assert_eq!(list[0]["like_count"], 1);

    // Alice earned 5 karma, visible on her profile and the leaderboard.
    let profile: Value = client
        .get(format!("{base}/api/users/{alice}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["total_karma"], 5);
    assert_eq!(profile["karma_24h"], 5);

    let board: Value = client
        .get(format!("{base}/api/leaderboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board[0]["username"], "alice");
    assert_eq!(board[0]["karma"], 5);

    // Unlike restores everything.
    let resp = client
        .delete(&like_url)
        .json(&json!({ "user_id": bob }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap()["removed"], true);
    let profile: Value = client
        .get(format!("{base}/api/users/{alice}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["total_karma"], 0);
}

#[tokio::test]
async fn validation_errors_map_to_http_statuses() {
    let (_tmp, base) = spawn_app().await;
    let client = reqwest::Client::new();

    let alice = create_user(&client, &base, "alice").await;

    // Liking a missing post is 404.
    let resp = client
        .post(format!("{base}/api/posts/nope/like"))
        .json(&json!({ "user_id": alice }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Cross-post parenting is 400.
    let post_a: Value = client
        .post(format!("{base}/api/posts"))
        .json(&json!({ "user_id": alice, "content": "a" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let post_b: Value = client
        .post(format!("{base}/api/posts"))
        .json(&json!({ "user_id": alice, "content": "b" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment: Value = client
        .post(format!("{base}/api/comments"))
        .json(&json!({
            "post_id": post_a["id"],
            "user_id": alice,
            "content": "on a"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let resp = client
        .post(format!("{base}/api/comments"))
        .json(&json!({
            "post_id": post_b["id"],
            "user_id": alice,
            "parent_id": comment["id"],
            "content": "stray"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Empty content is 400, missing post is 404.
    let resp = client
        .post(format!("{base}/api/posts"))
        .json(&json!({ "user_id": alice, "content": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let resp = client.get(format!("{base}/api/posts/nope")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn user_endpoint_is_get_or_create() {
    let (_tmp, base) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/users"))
        .json(&json!({ "username": "carol" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["created"], true);

    let resp = client
        .post(format!("{base}/api/users"))
        .json(&json!({ "username": "carol" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let second: Value = resp.json().await.unwrap();
    assert_eq!(second["created"], false);
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn deleting_a_comment_prunes_its_subtree_from_the_post() {
    let (_tmp, base) = spawn_app().await;
    let client = reqwest::Client::new();
    let alice = create_user(&client, &base, "alice").await;

    let post: Value = client
        .post(format!("{base}/api/posts"))
        .json(&json!({ "user_id": alice, "content": "thread" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let post_id = post["id"].as_str().unwrap();

    let top: Value = client
        .post(format!("{base}/api/comments"))
        .json(&json!({ "post_id": post_id, "user_id": alice, "content": "top" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reply: Value = client
        .post(format!("{base}/api/comments"))
        .json(&json!({
            "post_id": post_id,
            "user_id": alice,
            "parent_id": top["id"],
            "content": "reply"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Subtree of the top comment holds both.
    let sub: Value = client
        .get(format!("{base}/api/comments/{}/subtree", top["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sub.as_array().unwrap().len(), 1);
    assert_eq!(sub[0]["replies"][0]["id"], reply["id"]);

    let resp = client
        .delete(format!("{base}/api/comments/{}", top["id"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let detail: Value = client
        .get(format!("{base}/api/posts/{post_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(detail["comments"].as_array().unwrap().is_empty());
}
