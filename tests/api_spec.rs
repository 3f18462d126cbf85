use speculate2::speculate;

speculate! {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use pms::api::{self, StoreKind};
    use pms_core::models::{Project, Task, User};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn server(dir: &TempDir, kind: StoreKind) -> TestServer {
        let store = api::open_store(kind, dir.path()).expect("open store");
        TestServer::new(api::create_router(store, dir.path().join("uploads"))).expect("test server")
    }

    fn create_project(server: &TestServer, body: Value) -> Project {
        tokio_test::block_on(async {
            let response = server.post("/api/projects").json(&body).await;
            response.assert_status(StatusCode::CREATED);
            response.json::<Project>()
        })
    }

    describe "projects" {
        it "creates with defaults" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let project = create_project(&server, json!({"name": "Atlas"}));
            assert_eq!(project.status.as_str(), "In Development");
            assert_eq!(project.progress, 0);
            assert_eq!(project.priority.as_str(), "Medium");
            assert_eq!(project.description.as_deref(), Some(""));
            assert!(project.tech_stack.is_empty());
        }

        it "reads by path and by query" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Sqlite);
            let project = create_project(&server, json!({"name": "Atlas", "progress": "35"}));
            tokio_test::block_on(async {
                let by_path = server.get(&format!("/api/projects/{}", project.id)).await.json::<Project>();
                let by_query = server
                    .get("/api/projects.php")
                    .add_query_param("id", project.id.get())
                    .await
                    .json::<Project>();
                assert_eq!(by_path, by_query);
                assert_eq!(by_path.progress, 35);
            });
        }

        it "lists newest first" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let first = create_project(&server, json!({"name": "first"}));
            let second = create_project(&server, json!({"name": "second"}));
            let list = tokio_test::block_on(async { server.get("/api/projects").await }).json::<Vec<Project>>();
            assert_eq!(list.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        }

        it "updates with the id in the body" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let project = create_project(&server, json!({"name": "Atlas"}));
            let updated = tokio_test::block_on(async {
                server
                    .put("/api/projects")
                    .json(&json!({"id": project.id.get().to_string(), "name": "Atlas", "status": "Delivered", "progress": 100}))
                    .await
            });
            updated.assert_status_ok();
            assert_eq!(updated.json::<Project>().status.as_str(), "Delivered");
        }

        it "requires an id for body updates and deletes" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            tokio_test::block_on(async {
                let put = server.put("/api/projects").json(&json!({"name": "x"})).await;
                put.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(put.json::<Value>(), json!({"error": "Project ID required"}));

                let delete = server.delete("/api/projects").await;
                delete.assert_status(StatusCode::BAD_REQUEST);
            });
        }

        it "reports unknown ids as not found" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Sqlite);
            tokio_test::block_on(async {
                let response = server.put("/api/projects/99").json(&json!({"name": "ghost"})).await;
                response.assert_status(StatusCode::NOT_FOUND);
                assert_eq!(response.json::<Value>(), json!({"error": "Project not found"}));
            });
        }

        it "deleting cascades to tasks" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let doomed = create_project(&server, json!({"name": "Doomed"}));
            let kept = create_project(&server, json!({"name": "Kept"}));
            tokio_test::block_on(async {
                server.post("/api/tasks").json(&json!({"title": "a", "project_id": doomed.id})).await.assert_status(StatusCode::CREATED);
                server.post("/api/tasks").json(&json!({"title": "b", "project_id": kept.id})).await.assert_status(StatusCode::CREATED);

                let ack = server.delete("/api/projects").json(&json!({"id": doomed.id})).await;
                ack.assert_status_ok();
                assert_eq!(ack.json::<Value>()["success"], json!(true));

                let tasks = server.get("/api/tasks").await.json::<Vec<Task>>();
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].project_id, Some(kept.id));
            });
        }
    }

    describe "users and tasks" {
        it "defaults the role and avatar" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let response = tokio_test::block_on(async {
                server.post("/api/users").json(&json!({"name": "Ana Lee"})).await
            });
            response.assert_status(StatusCode::CREATED);
            let user = response.json::<User>();
            assert_eq!(user.role.as_str(), "Team");
            assert_eq!(user.avatar_url.as_deref(), Some("https://ui-avatars.com/api/?name=Ana%20Lee"));
        }

        it "enriches tasks and filters by project" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Sqlite);
            let project = create_project(&server, json!({"name": "Atlas"}));
            tokio_test::block_on(async {
                let user = server.post("/api/users").json(&json!({"name": "Bo", "role": "Admin"})).await.json::<User>();
                server
                    .post("/api/tasks")
                    .json(&json!({"title": "Wire", "project_id": project.id, "user_id": user.id}))
                    .await
                    .assert_status(StatusCode::CREATED);
                server.post("/api/tasks").json(&json!({"title": "Loose"})).await.assert_status(StatusCode::CREATED);

                let tasks = server
                    .get("/api/tasks")
                    .add_query_param("project_id", project.id.get())
                    .await
                    .json::<Vec<Task>>();
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].status, "Pending");
                assert_eq!(tasks[0].project_name.as_deref(), Some("Atlas"));
                assert_eq!(tasks[0].assigned_user_name.as_deref(), Some("Bo"));
            });
        }
    }

    describe "uploads" {
        it "stores images and serves them" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            tokio_test::block_on(async {
                let form = MultipartForm::new().add_part(
                    "media",
                    Part::bytes(vec![137, 80, 78, 71]).file_name("shot.png").mime_type("image/png"),
                );
                let response = server.post("/api/upload").multipart(form).await;
                response.assert_status_ok();
                let body = response.json::<Value>();
                assert_eq!(body["success"], json!(true));
                assert_eq!(body["originalName"], json!("shot.png"));
                let url = body["url"].as_str().unwrap().to_string();
                assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

                server.get(&url).await.assert_status_ok();

                let filename = body["filename"].as_str().unwrap();
                server.delete(&format!("/api/upload/{filename}")).await.assert_status_ok();
                server.delete(&format!("/api/upload/{filename}")).await.assert_status_not_found();
            });
        }

        it "rejects other file types" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let form = MultipartForm::new().add_part(
                "media",
                Part::bytes(b"hello".to_vec()).file_name("notes.txt").mime_type("text/plain"),
            );
            let response = tokio_test::block_on(async { server.post("/api/upload").multipart(form).await });
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>()["success"], json!(false));
        }

        it "refuses paths in delete" {
            let dir = TempDir::new().unwrap();
            let server = server(&dir, StoreKind::Json);
            let response = tokio_test::block_on(async {
                server
                    .delete("/api/upload.php")
                    .add_query_param("filename", "../database.json")
                    .await
            });
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>(), json!({"error": "Invalid filename"}));
        }
    }
}
