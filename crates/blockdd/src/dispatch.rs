//! Command dispatch: one protocol request in, exactly one response out

use blockd_api::{
    ClientRole, Command, ErrorCode, ErrorInfo, Request, Response, ResponsePayload, API_VERSION,
};
use blockd_core::Engine;
use blockd_util::{BlockdError, ClientId, Result};
use tracing::{debug, warn};

use crate::bridge::BrowserBridge;

/// Default row count for `GET_TOP_WEBSITES`
const DEFAULT_TOP_LIMIT: usize = 5;

/// Run one request against the engine
pub async fn handle_request(
    engine: &mut Engine,
    bridge: &BrowserBridge,
    client_id: &ClientId,
    role: ClientRole,
    request: Request,
) -> Response {
    let request_id = request.request_id;

    if request.api_version != API_VERSION {
        return Response::error(
            request_id,
            ErrorInfo::new(
                ErrorCode::InvalidRequest,
                format!(
                    "Unsupported API version {} (expected {})",
                    request.api_version, API_VERSION
                ),
            ),
        );
    }

    if let Err(e) = authorize(role, &request.command) {
        warn!(client_id = %client_id, role = ?role, error = %e, "Request denied");
        return Response::error(request_id, error_info(&e));
    }

    match execute(engine, bridge, client_id, request.command).await {
        Ok(payload) => Response::success(request_id, payload),
        Err(e) => {
            debug!(client_id = %client_id, request_id, error = %e, "Command failed");
            Response::error(request_id, error_info(&e))
        }
    }
}

fn authorize(role: ClientRole, command: &Command) -> Result<()> {
    if matches!(command, Command::ClearData) && !role.can_clear_data() {
        return Err(BlockdError::permission("Clearing usage data requires admin"));
    }
    if command.is_mutation() && !role.can_mutate() {
        return Err(BlockdError::permission("Read-only client"));
    }
    Ok(())
}

/// Protocol error for an engine error
pub fn error_info(e: &BlockdError) -> ErrorInfo {
    let code = match e {
        BlockdError::ChallengeNotFound(_) => ErrorCode::ChallengeNotFound,
        BlockdError::NoActiveGrant(_) => ErrorCode::NoActiveGrant,
        BlockdError::CooldownActive { .. } => ErrorCode::CooldownActive,
        BlockdError::ValidationError(_) => ErrorCode::ValidationError,
        BlockdError::PermissionDenied(_) => ErrorCode::PermissionDenied,
        BlockdError::StoreError(_) => ErrorCode::StoreError,
        BlockdError::HostError(_) => ErrorCode::HostError,
        BlockdError::ConfigError(_) | BlockdError::IpcError(_) | BlockdError::Internal(_) => {
            ErrorCode::InternalError
        }
    };
    ErrorInfo::new(code, e.to_string())
}

async fn execute(
    engine: &mut Engine,
    bridge: &BrowserBridge,
    client_id: &ClientId,
    command: Command,
) -> Result<ResponsePayload> {
    let payload = match command {
        Command::BlockDomain { domain } => ResponsePayload::BlockedDomains {
            blocked_domains: engine.block_domain(&domain).await?,
        },

        Command::RemoveBlockedDomain { domain } => ResponsePayload::BlockedDomains {
            blocked_domains: engine.remove_blocked_domain(&domain).await?,
        },

        Command::StartUnblockChallenge { domain } => {
            ResponsePayload::Challenge(engine.start_unblock_challenge(&domain)?)
        }

        Command::SubmitChallenge {
            challenge_id,
            answers,
            minutes,
        } => {
            let (outcome, grant) = engine
                .submit_unblock_challenge(challenge_id, &answers, minutes)
                .await?;
            ResponsePayload::UnblockResult { outcome, grant }
        }

        Command::ActivateFocusMode { minutes } => {
            ResponsePayload::FocusStatus(engine.activate_focus(minutes).await?)
        }

        Command::StartFocusDeactivationChallenge => {
            ResponsePayload::Challenge(engine.start_focus_deactivation_challenge()?)
        }

        Command::SubmitFocusDeactivationChallenge {
            challenge_id,
            answers,
        } => {
            let (outcome, focus_status) = engine
                .submit_focus_deactivation(challenge_id, &answers)
                .await?;
            ResponsePayload::FocusDeactivationResult {
                outcome,
                focus_status,
            }
        }

        Command::AddFocusDomain { domain } => ResponsePayload::FocusDomains {
            focus_domains: engine.add_focus_domain(&domain).await?,
        },

        Command::RemoveFocusDomain { domain } => ResponsePayload::FocusDomains {
            focus_domains: engine.remove_focus_domain(&domain).await?,
        },

        Command::ToggleFocusDomain { domain } => ResponsePayload::FocusDomains {
            focus_domains: engine.toggle_focus_domain(&domain).await?,
        },

        Command::GrantTempAccess { domain, minutes } => {
            ResponsePayload::Grant(engine.grant_temp_access(&domain, minutes).await?)
        }

        Command::ExtendTempAccess { domain, minutes } => {
            ResponsePayload::Grant(engine.extend_temp_access(&domain, minutes).await?)
        }

        Command::RevokeTempAccess { domain } => ResponsePayload::Revoked {
            domain: engine.revoke_temp_access(&domain).await?,
        },

        Command::GetTempAccess => ResponsePayload::Grants {
            grants: engine.temp_access(),
        },

        Command::GetBlockingStats => ResponsePayload::BlockingStats(engine.blocking_stats()),

        Command::GetCurrentStatus | Command::GetLiveSession => {
            ResponsePayload::TrackingStatus(engine.current_status())
        }

        Command::GetTodayData => ResponsePayload::TodayData {
            date: engine.today_key(),
            sites: engine.today_data(),
        },

        Command::GetTopWebsites { limit } => ResponsePayload::TopWebsites {
            sites: engine.top_websites(limit.unwrap_or(DEFAULT_TOP_LIMIT)),
        },

        Command::GetTodayTotal => ResponsePayload::TodayTotal(engine.today_total()),

        Command::GetRules => ResponsePayload::Rules(engine.rules().clone()),

        Command::ForceSave => {
            let seconds = engine.force_save();
            debug!(seconds, "Forced tracking save");
            ResponsePayload::Saved
        }

        Command::ClearData => {
            engine.clear_data();
            ResponsePayload::DataCleared
        }

        Command::TabUpdated {
            tab_id,
            url,
            active,
        } => {
            bridge.record_tab(tab_id, &url, active);
            engine.tab_updated(tab_id, &url, active);
            ResponsePayload::Ack
        }

        Command::TabActivated { tab_id, url } => {
            bridge.activate_tab(tab_id, url.as_deref());
            engine.tab_activated(tab_id, url.as_deref()).await;
            ResponsePayload::Ack
        }

        Command::TabRemoved { tab_id } => {
            bridge.remove_tab(tab_id);
            engine.tab_removed(tab_id).await;
            ResponsePayload::Ack
        }

        Command::WindowFocusChanged { focused } => {
            engine.window_focus_changed(focused).await;
            ResponsePayload::Ack
        }

        // The IPC layer flips the subscription flag before we see these
        Command::SubscribeEvents => ResponsePayload::Subscribed {
            client_id: client_id.clone(),
            rules: engine.rules().clone(),
        },

        Command::UnsubscribeEvents => ResponsePayload::Unsubscribed,

        Command::GetHealth => ResponsePayload::Health(engine.health()),

        Command::Ping => ResponsePayload::Pong,
    };

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockd_api::{ChallengeOutcome, ChallengeView};
    use blockd_config::Policy;
    use blockd_core::{EngineDeps, SequentialProblemSupplier};
    use blockd_store::MemoryStore;
    use blockd_util::{Domain, ManualClock, TabId};
    use chrono::{Local, TimeZone};
    use std::sync::Arc;

    struct Fixture {
        engine: Engine,
        bridge: Arc<BrowserBridge>,
        client: ClientId,
        next_id: u64,
    }

    impl Fixture {
        async fn new() -> Self {
            let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap());
            let bridge = Arc::new(BrowserBridge::new(None));
            let mut policy = Policy::default();
            policy.blocking.focus_domains = vec![Domain::parse("youtube.com").unwrap()];

            let mut engine = Engine::new(
                policy,
                EngineDeps {
                    clock: Arc::new(clock),
                    store: Arc::new(MemoryStore::new()),
                    installer: bridge.clone(),
                    tabs: bridge.clone(),
                    problems: Box::new(SequentialProblemSupplier),
                },
            );
            engine.start().await.unwrap();

            Self {
                engine,
                bridge,
                client: ClientId::new(),
                next_id: 1,
            }
        }

        async fn send_as(&mut self, role: ClientRole, command: Command) -> Response {
            let request = Request::new(self.next_id, command);
            self.next_id += 1;
            handle_request(&mut self.engine, &self.bridge, &self.client, role, request).await
        }

        async fn send(&mut self, command: Command) -> Response {
            self.send_as(ClientRole::Extension, command).await
        }
    }

    fn error_code(response: Response) -> ErrorCode {
        response.into_result().unwrap_err().code
    }

    #[tokio::test]
    async fn block_domain_returns_sorted_list() {
        let mut f = Fixture::new().await;

        f.send(Command::BlockDomain {
            domain: "www.Reddit.com".into(),
        })
        .await;
        let response = f
            .send(Command::BlockDomain {
                domain: "facebook.com".into(),
            })
            .await;

        match response.into_result().unwrap() {
            ResponsePayload::BlockedDomains { blocked_domains } => {
                let names: Vec<&str> = blocked_domains.iter().map(|d| d.as_str()).collect();
                assert_eq!(names, vec!["facebook.com", "reddit.com"]);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_current_rules() {
        let mut f = Fixture::new().await;
        f.send(Command::BlockDomain {
            domain: "reddit.com".into(),
        })
        .await;
        let reddit = Domain::parse("reddit.com").unwrap();

        let response = f.send_as(ClientRole::Observer, Command::SubscribeEvents).await;
        match response.into_result().unwrap() {
            ResponsePayload::Subscribed { client_id, rules } => {
                assert_eq!(client_id, f.client);
                assert!(rules.is_blocked(&reddit));
            }
            other => panic!("unexpected payload {:?}", other),
        }

        let response = f.send_as(ClientRole::Observer, Command::GetRules).await;
        match response.into_result().unwrap() {
            ResponsePayload::Rules(rules) => {
                assert_eq!(&rules, f.engine.rules());
                assert_eq!(rules.rule_for(&reddit).unwrap().url_filter, "||reddit.com^");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_domain_is_a_validation_error() {
        let mut f = Fixture::new().await;
        let response = f
            .send(Command::BlockDomain {
                domain: "not a domain".into(),
            })
            .await;
        assert_eq!(error_code(response), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn observers_cannot_mutate() {
        let mut f = Fixture::new().await;

        let denied = f
            .send_as(
                ClientRole::Observer,
                Command::ActivateFocusMode { minutes: None },
            )
            .await;
        assert_eq!(error_code(denied), ErrorCode::PermissionDenied);
        assert!(!f.engine.focus_status().active);

        let allowed = f.send_as(ClientRole::Observer, Command::GetBlockingStats).await;
        assert!(allowed.success);
    }

    #[tokio::test]
    async fn clear_data_requires_admin() {
        let mut f = Fixture::new().await;

        let denied = f.send(Command::ClearData).await;
        assert_eq!(error_code(denied), ErrorCode::PermissionDenied);

        let allowed = f.send_as(ClientRole::Admin, Command::ClearData).await;
        assert!(matches!(
            allowed.into_result().unwrap(),
            ResponsePayload::DataCleared
        ));
    }

    #[tokio::test]
    async fn wrong_api_version_is_rejected() {
        let mut f = Fixture::new().await;
        let mut request = Request::new(42, Command::Ping);
        request.api_version = API_VERSION + 1;

        let response = handle_request(
            &mut f.engine,
            &f.bridge,
            &f.client,
            ClientRole::Extension,
            request,
        )
        .await;

        assert_eq!(response.request_id, 42);
        assert_eq!(error_code(response), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn not_found_errors_keep_their_codes() {
        let mut f = Fixture::new().await;

        let response = f
            .send(Command::ExtendTempAccess {
                domain: "reddit.com".into(),
                minutes: None,
            })
            .await;
        assert_eq!(error_code(response), ErrorCode::NoActiveGrant);

        let response = f
            .send(Command::SubmitChallenge {
                challenge_id: blockd_util::ChallengeId::new(),
                answers: vec!["1".into()],
                minutes: None,
            })
            .await;
        assert_eq!(error_code(response), ErrorCode::ChallengeNotFound);
    }

    #[tokio::test]
    async fn solved_unblock_challenge_grants_access() {
        let mut f = Fixture::new().await;
        f.send(Command::BlockDomain {
            domain: "reddit.com".into(),
        })
        .await;

        let challenge: ChallengeView = match f
            .send(Command::StartUnblockChallenge {
                domain: "reddit.com".into(),
            })
            .await
            .into_result()
            .unwrap()
        {
            ResponsePayload::Challenge(view) => view,
            other => panic!("unexpected payload {:?}", other),
        };
        assert_eq!(challenge.problems.len(), 2);

        let response = f
            .send(Command::SubmitChallenge {
                challenge_id: challenge.challenge_id,
                answers: vec!["1".into(), "2".into()],
                minutes: Some(10),
            })
            .await;

        match response.into_result().unwrap() {
            ResponsePayload::UnblockResult { outcome, grant } => {
                assert_eq!(outcome, ChallengeOutcome::Solved);
                assert_eq!(grant.unwrap().remaining_seconds, 600);
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(!f.engine.is_blocked(&Domain::parse("reddit.com").unwrap()));
    }

    #[tokio::test]
    async fn tab_events_feed_the_mirror() {
        let mut f = Fixture::new().await;

        f.send(Command::TabUpdated {
            tab_id: TabId(3),
            url: "https://docs.rs/serde".into(),
            active: true,
        })
        .await;
        assert_eq!(f.bridge.tab_count(), 1);

        match f.send(Command::GetCurrentStatus).await.into_result().unwrap() {
            ResponsePayload::TrackingStatus(status) => {
                assert!(status.is_tracking);
                assert_eq!(status.current_domain.unwrap().as_str(), "docs.rs");
            }
            other => panic!("unexpected payload {:?}", other),
        }

        f.send(Command::TabRemoved { tab_id: TabId(3) }).await;
        assert_eq!(f.bridge.tab_count(), 0);
    }

    #[tokio::test]
    async fn top_websites_defaults_to_five() {
        let mut f = Fixture::new().await;
        let response = f.send(Command::GetTopWebsites { limit: None }).await;
        assert!(matches!(
            response.into_result().unwrap(),
            ResponsePayload::TopWebsites { sites } if sites.len() <= DEFAULT_TOP_LIMIT
        ));
    }
}
