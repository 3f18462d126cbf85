use speculate2::speculate;

speculate! {
    use pms_core::derive::{SortDirection, SortField};
    use pms_core::models::{
        EntityId, MediaFile, Project, ProjectDraft, ProjectStatus, Task, TaskDraft, User, UserDraft, UserRole,
    };
    use pms_core::state::{
        Action, AppState, DraftEdit, Effect, ErrorKind, Notice, Reconciliation, RequestToken,
        SectionId, SyncOutcome, SyncRequest,
    };
    use pms_core::view::{self, Screen, SectionBody};

    fn projects() -> Vec<Project> {
        vec![
            ProjectDraft::new("Atlas").into_project(EntityId::new(1)),
            ProjectDraft::new("Beacon")
                .with_status(ProjectStatus::Planning)
                .into_project(EntityId::new(2)),
        ]
    }

    fn users() -> Vec<User> {
        vec![
            UserDraft::new("Ana", UserRole::Admin).into_user(EntityId::new(1)),
            UserDraft::new("Bo", UserRole::Team).into_user(EntityId::new(2)),
        ]
    }

    fn tasks() -> Vec<Task> {
        vec![
            TaskDraft::new("Wire API").for_project(EntityId::new(1)).assigned_to(EntityId::new(2)).into_task(EntityId::new(1)),
            TaskDraft::new("Sketch").for_project(EntityId::new(2)).into_task(EntityId::new(2)),
        ]
    }

    fn sync_of(effects: &[Effect]) -> (RequestToken, SyncRequest) {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Sync { token, request } => Some((*token, request.clone())),
                _ => None,
            })
            .expect("expected a sync effect")
    }

    fn everything() -> Reconciliation {
        Reconciliation {
            projects: Some(projects()),
            users: Some(users()),
            tasks: Some(tasks()),
        }
    }

    /// Loaded state logged in as the given user.
    fn logged_in(user_id: i64) -> AppState {
        let mut state = AppState::new(Some(EntityId::new(user_id)));
        let (token, _) = sync_of(&state.start());
        state.apply_sync(SyncOutcome { token, result: Ok(everything()) });
        state
    }

    fn editing_atlas() -> AppState {
        let mut state = logged_in(1);
        state.dispatch(Action::OpenProject(EntityId::new(1)));
        state.dispatch(Action::BeginEdit);
        state
    }

    describe "session" {
        it "resolves the saved user once users load" {
            let state = logged_in(1);
            assert_eq!(state.current_user.as_ref().map(|u| u.name.as_str()), Some("Ana"));
            assert!(state.loaded);
        }

        it "falls back to the login chooser when the saved user is gone" {
            let mut state = AppState::new(Some(EntityId::new(42)));
            let (token, _) = sync_of(&state.start());
            let effects = state.apply_sync(SyncOutcome { token, result: Ok(everything()) });
            assert!(state.current_user.is_none());
            assert_eq!(effects, vec![Effect::PersistSession(None)]);
            match view::render(&state).screen {
                Screen::Login(choices) => assert_eq!(choices.len(), 2),
                other => panic!("expected login screen, got {:?}", other),
            }
        }

        it "persists a login and clears it on logout" {
            let mut state = logged_in(99);
            assert_eq!(
                state.dispatch(Action::Login(EntityId::new(2))),
                vec![Effect::PersistSession(Some(EntityId::new(2)))]
            );
            assert_eq!(state.dispatch(Action::Logout), vec![Effect::PersistSession(None)]);
            assert!(state.current_user.is_none());
        }

        it "rejects an unknown user" {
            let mut state = logged_in(1);
            assert!(state.dispatch(Action::Login(EntityId::new(77))).is_empty());
            assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(ErrorKind::NotFound));
        }
    }

    describe "navigation" {
        it "switching section closes the open project" {
            let mut state = logged_in(1);
            state.dispatch(Action::OpenProject(EntityId::new(2)));
            state.dispatch(Action::ShowSection(SectionId::Team));
            assert!(state.current_entity.is_none());
            match view::render(&state).screen {
                Screen::Section(section) => {
                    assert_eq!(section.title, "Team");
                    assert!(matches!(section.body, SectionBody::Team(ref members) if members.len() == 2));
                }
                other => panic!("expected section, got {:?}", other),
            }
        }

        it "sort toggles direction on the same field" {
            let mut state = logged_in(1);
            state.dispatch(Action::SortBy(SortField::Name));
            state.dispatch(Action::SortBy(SortField::Name));
            assert_eq!(state.sort.map(|s| s.direction), Some(SortDirection::Desc));
        }

        it "my tasks shows only the current user's tasks" {
            let mut state = logged_in(2);
            state.dispatch(Action::ShowSection(SectionId::MyTasks));
            match view::render(&state).screen {
                Screen::Section(section) => match section.body {
                    SectionBody::MyTasks(rows) => {
                        assert_eq!(rows.len(), 1);
                        assert_eq!(rows[0].project_name.as_deref(), Some("Atlas"));
                    }
                    other => panic!("unexpected body {:?}", other),
                },
                other => panic!("expected section, got {:?}", other),
            }
        }
    }

    describe "editing" {
        it "is limited to admins" {
            let mut state = logged_in(2);
            state.dispatch(Action::OpenProject(EntityId::new(1)));
            state.dispatch(Action::BeginEdit);
            assert!(!state.edit_mode);
            assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(ErrorKind::Validation));
        }

        it "sends the full draft on save" {
            let mut state = editing_atlas();
            state.dispatch(Action::EditDraft(DraftEdit::Progress(60)));
            let (_, request) = sync_of(&state.dispatch(Action::SaveEdit));
            match request {
                SyncRequest::UpdateProject { id, draft, media, .. } => {
                    assert_eq!(id, EntityId::new(1));
                    assert_eq!(draft.name, "Atlas");
                    assert_eq!(draft.progress, 60);
                    assert!(media.is_none());
                }
                other => panic!("unexpected request {:?}", other),
            }
            assert!(state.is_submitting());
        }

        it "cancel discards the draft and staged media" {
            let mut state = editing_atlas();
            state.dispatch(Action::EditDraft(DraftEdit::StageMedia(MediaFile::new("a.png", "image/png", vec![1, 2]))));
            state.dispatch(Action::CancelEdit);
            assert!(!state.edit_mode);
            assert!(state.edit_draft.is_none());
            assert!(state.staged_media.is_none());
        }

        it "a failed update leaves the projects untouched" {
            let mut state = editing_atlas();
            let before = state.projects.clone();
            state.dispatch(Action::EditDraft(DraftEdit::Name("Renamed".into())));
            let (token, _) = sync_of(&state.dispatch(Action::SaveEdit));

            state.apply_sync(SyncOutcome {
                token,
                result: Err(Notice::new(ErrorKind::NotFound, "Project not found")),
            });

            assert_eq!(state.projects, before);
            assert!(state.edit_mode);
            assert!(!state.is_submitting());
            assert_eq!(state.notice.as_ref().map(|n| n.message.as_str()), Some("Project not found"));
        }

        it "a successful update refreshes the open project and leaves edit mode" {
            let mut state = editing_atlas();
            let (token, _) = sync_of(&state.dispatch(Action::SaveEdit));
            let mut updated = projects();
            updated[0].progress = 90;

            state.apply_sync(SyncOutcome {
                token,
                result: Ok(Reconciliation { projects: Some(updated), ..Default::default() }),
            });

            assert!(!state.edit_mode);
            assert_eq!(state.current_entity.as_ref().map(|p| p.progress), Some(90));
        }
    }

    describe "request tokens" {
        it "discards a result superseded by a newer request of the same kind" {
            let mut state = editing_atlas();
            let (first, _) = sync_of(&state.dispatch(Action::SaveEdit));
            let (second, _) = sync_of(&state.dispatch(Action::SaveEdit));
            let mut stale = projects();
            stale[0].name = "Stale".into();

            state.apply_sync(SyncOutcome {
                token: first,
                result: Ok(Reconciliation { projects: Some(stale), ..Default::default() }),
            });

            assert_eq!(state.projects[0].name, "Atlas");
            assert!(state.is_submitting());
            assert!(state.is_current(second));
            assert!(!state.is_current(first));
        }

        it "other kinds do not supersede each other" {
            let mut state = logged_in(1);
            let (load, _) = sync_of(&state.dispatch(Action::Refresh));
            state.dispatch(Action::CreateTask(TaskDraft::new("x")));
            assert!(state.is_current(load));
        }
    }

    describe "delete" {
        it "asks for confirmation and clears the open project afterwards" {
            let mut state = logged_in(1);
            state.dispatch(Action::OpenProject(EntityId::new(2)));
            assert!(state.dispatch(Action::RequestDelete).is_empty());
            assert_eq!(state.pending_delete, Some(EntityId::new(2)));

            let (token, request) = sync_of(&state.dispatch(Action::ConfirmDelete));
            assert_eq!(request, SyncRequest::DeleteProject { id: EntityId::new(2), media_url: None });

            let remaining: Vec<Project> = projects().into_iter().filter(|p| p.id.get() != 2).collect();
            let remaining_tasks: Vec<Task> = tasks().into_iter().filter(|t| t.project_id != Some(EntityId::new(2))).collect();
            state.apply_sync(SyncOutcome {
                token,
                result: Ok(Reconciliation {
                    projects: Some(remaining),
                    tasks: Some(remaining_tasks),
                    users: None,
                }),
            });

            assert!(state.current_entity.is_none());
            assert!(state.projects.iter().all(|p| p.id.get() != 2));
            assert!(state.tasks.iter().all(|t| t.project_id != Some(EntityId::new(2))));
        }

        it "cancel leaves everything in place" {
            let mut state = logged_in(1);
            state.dispatch(Action::OpenProject(EntityId::new(2)));
            state.dispatch(Action::RequestDelete);
            state.dispatch(Action::CancelDelete);
            assert!(state.dispatch(Action::ConfirmDelete).is_empty());
            assert_eq!(state.projects.len(), 2);
        }
    }

    describe "create" {
        it "requires a name" {
            let mut state = logged_in(1);
            let effects = state.dispatch(Action::CreateProject { draft: ProjectDraft::new("  "), media: None });
            assert!(effects.is_empty());
            assert_eq!(state.notice.as_ref().map(|n| n.kind), Some(ErrorKind::Validation));
        }

        it "a failed upload leaves the projects unchanged" {
            let mut state = logged_in(1);
            let before = state.projects.clone();
            let media = MediaFile::new("notes.txt", "text/plain", b"hi".to_vec());
            let (token, _) = sync_of(&state.dispatch(Action::CreateProject {
                draft: ProjectDraft::new("Comet"),
                media: Some(media),
            }));
            state.apply_sync(SyncOutcome {
                token,
                result: Err(Notice::new(ErrorKind::Upload, "Invalid file type")),
            });
            assert_eq!(state.projects, before);
        }
    }

    describe "rendering" {
        it "clamps only the drawn progress" {
            let mut state = logged_in(1);
            let mut wild = projects();
            wild[0].progress = 140;
            let (token, _) = sync_of(&state.dispatch(Action::Refresh));
            state.apply_sync(SyncOutcome {
                token,
                result: Ok(Reconciliation { projects: Some(wild), ..Default::default() }),
            });
            assert_eq!(state.projects[0].progress, 140);
            match view::render(&state).screen {
                Screen::Section(section) => match section.body {
                    SectionBody::Dashboard(dashboard) => {
                        let atlas = dashboard.projects.iter().find(|p| p.name == "Atlas").expect("Atlas listed");
                        assert_eq!(atlas.progress, 140);
                        assert_eq!(atlas.display_progress, 100);
                    }
                    other => panic!("unexpected body {:?}", other),
                },
                other => panic!("expected section, got {:?}", other),
            }
        }

        it "shows management affordances to admins only" {
            let mut admin = logged_in(1);
            admin.dispatch(Action::OpenProject(EntityId::new(1)));
            let mut member = logged_in(2);
            member.dispatch(Action::OpenProject(EntityId::new(1)));
            let can_manage = |state: &AppState| match view::render(state).screen {
                Screen::Section(section) => section.detail.map(|d| d.can_manage),
                _ => None,
            };
            assert_eq!(can_manage(&admin), Some(true));
            assert_eq!(can_manage(&member), Some(false));
        }
    }
}
