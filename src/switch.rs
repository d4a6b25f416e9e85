//! The default-output switch transaction.
//!
//! Resolves the configured device pair against the live endpoint set,
//! decides the toggle target, and assigns it for every device role through
//! the policy interface. One call is one linear transaction: resolve, bind,
//! switch, release. Nothing is cached across runs.

use crate::audio::device::{AudioEndpoint, AudioError, DeviceRole, ALL_ROLES};

/// Friendly name of the headphone endpoint.
///
/// This is the toggle's home side: any current default other than this
/// device (including one that is neither configured device) switches back
/// to it.
pub const PRIMARY_DEVICE_NAME: &str = "Headphones (2- Shure MV7+)";

/// Friendly name of the speaker endpoint.
pub const SECONDARY_DEVICE_NAME: &str = "Speakers (Realtek(R) Audio)";

/// Read access to the system's render endpoints.
pub trait EndpointDirectory {
    /// Every active render endpoint.
    fn endpoints(&self) -> Result<Vec<AudioEndpoint>, AudioError>;

    /// The current default render endpoint.
    fn default_endpoint(&self) -> Result<AudioEndpoint, AudioError>;
}

/// A bound policy interface that can reassign the default endpoint.
///
/// A failed assignment for one role is reported through the `Err` value and
/// must not affect the ability to assign the remaining roles.
pub trait EndpointPolicy {
    /// Make `endpoint_id` the default render endpoint for `role`.
    fn set_default_endpoint(&self, endpoint_id: &str, role: DeviceRole)
        -> Result<(), AudioError>;
}

/// Activates the policy interface.
///
/// The returned policy owns the underlying handle and releases it exactly
/// once when dropped, whatever happened in between.
pub trait PolicyBinder {
    type Policy: EndpointPolicy;

    fn bind(&self) -> Result<Self::Policy, AudioError>;
}

/// The device pair the switch toggles between.
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// Friendly name of the toggle's home device.
    pub primary_name: String,

    /// Friendly name of the counterpart device.
    pub secondary_name: String,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            primary_name: PRIMARY_DEVICE_NAME.to_string(),
            secondary_name: SECONDARY_DEVICE_NAME.to_string(),
        }
    }
}

/// Outcome of one role assignment.
#[derive(Debug)]
pub struct RoleOutcome {
    pub role: DeviceRole,
    pub result: Result<(), AudioError>,
}

/// Outcome of one switch transaction.
#[derive(Debug)]
pub struct SwitchOutcome {
    /// The endpoint the switch targeted.
    pub target: AudioEndpoint,

    /// Per-role assignment results, in role order.
    pub roles: Vec<RoleOutcome>,
}

impl SwitchOutcome {
    /// True only if every role assignment succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.roles.iter().all(|r| r.result.is_ok())
    }

    /// Roles whose assignment failed.
    pub fn failed_roles(&self) -> Vec<DeviceRole> {
        self.roles
            .iter()
            .filter(|r| r.result.is_err())
            .map(|r| r.role)
            .collect()
    }
}

/// Pick the endpoint to switch to.
///
/// The counterpart of the current default when the current default is the
/// primary device; the primary device for anything else.
pub fn toggle_target<'a>(
    current_id: &str,
    primary: &'a AudioEndpoint,
    secondary: &'a AudioEndpoint,
) -> &'a AudioEndpoint {
    if current_id == primary.id {
        secondary
    } else {
        primary
    }
}

/// Runs the switch transaction against a directory and a policy binder.
pub struct SwitchController {
    config: SwitchConfig,
}

impl SwitchController {
    /// Create a controller for the given device pair.
    pub fn new(config: SwitchConfig) -> Self {
        Self { config }
    }

    /// Resolve the configured pair, read the current default, and assign
    /// the toggle target for every role.
    ///
    /// Device resolution happens before the policy interface is activated,
    /// so a missing device never acquires a handle. Role failures are
    /// collected rather than short-circuiting; the policy handle is
    /// released when the bound policy drops, on every path out of this
    /// function.
    pub fn run<D, B>(&self, directory: &D, binder: &B) -> Result<SwitchOutcome, AudioError>
    where
        D: EndpointDirectory,
        B: PolicyBinder,
    {
        let endpoints = directory.endpoints()?;

        let primary = find_by_name(&endpoints, &self.config.primary_name);
        let secondary = find_by_name(&endpoints, &self.config.secondary_name);
        let (Some(primary), Some(secondary)) = (primary, secondary) else {
            let mut missing = Vec::new();
            let mut found = Vec::new();
            for (name, hit) in [
                (&self.config.primary_name, primary),
                (&self.config.secondary_name, secondary),
            ] {
                if hit.is_some() {
                    found.push(name.clone());
                } else {
                    missing.push(name.clone());
                }
            }
            return Err(AudioError::DeviceNotFound { missing, found });
        };

        let current = directory.default_endpoint()?;
        let target = toggle_target(&current.id, primary, secondary);

        let policy = binder.bind()?;
        let roles = ALL_ROLES
            .iter()
            .map(|&role| RoleOutcome {
                role,
                result: policy.set_default_endpoint(&target.id, role),
            })
            .collect();

        Ok(SwitchOutcome {
            target: target.clone(),
            roles,
        })
    }
}

fn find_by_name<'a>(endpoints: &'a [AudioEndpoint], name: &str) -> Option<&'a AudioEndpoint> {
    endpoints.iter().find(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const ACCESS_DENIED: i32 = 0x8007_0005_u32 as i32;

    fn headphones() -> AudioEndpoint {
        AudioEndpoint::new("id-shure", PRIMARY_DEVICE_NAME)
    }

    fn speakers() -> AudioEndpoint {
        AudioEndpoint::new("id-realtek", SECONDARY_DEVICE_NAME)
    }

    fn other_mic() -> AudioEndpoint {
        AudioEndpoint::new("id-other", "Other Mic")
    }

    struct StubDirectory {
        endpoints: Vec<AudioEndpoint>,
        default_id: String,
    }

    impl StubDirectory {
        fn new(endpoints: Vec<AudioEndpoint>, default_id: &str) -> Self {
            Self {
                endpoints,
                default_id: default_id.to_string(),
            }
        }
    }

    impl EndpointDirectory for StubDirectory {
        fn endpoints(&self) -> Result<Vec<AudioEndpoint>, AudioError> {
            Ok(self.endpoints.clone())
        }

        fn default_endpoint(&self) -> Result<AudioEndpoint, AudioError> {
            self.endpoints
                .iter()
                .find(|e| e.id == self.default_id)
                .cloned()
                .ok_or(AudioError::NoDefaultDevice)
        }
    }

    /// Shared log of everything that crossed the policy seam.
    #[derive(Default)]
    struct PolicyLog {
        calls: RefCell<Vec<(String, DeviceRole)>>,
        binds: Cell<usize>,
        releases: Cell<usize>,
    }

    struct StubPolicy {
        log: Rc<PolicyLog>,
        fail_role: Option<(DeviceRole, i32)>,
    }

    impl EndpointPolicy for StubPolicy {
        fn set_default_endpoint(
            &self,
            endpoint_id: &str,
            role: DeviceRole,
        ) -> Result<(), AudioError> {
            self.log
                .calls
                .borrow_mut()
                .push((endpoint_id.to_string(), role));
            match self.fail_role {
                Some((failing, status)) if failing == role => {
                    Err(AudioError::EndpointAssignment { role, status })
                }
                _ => Ok(()),
            }
        }
    }

    impl Drop for StubPolicy {
        fn drop(&mut self) {
            self.log.releases.set(self.log.releases.get() + 1);
        }
    }

    struct StubBinder {
        log: Rc<PolicyLog>,
        fail_status: Option<i32>,
        fail_role: Option<(DeviceRole, i32)>,
    }

    impl StubBinder {
        fn new(log: Rc<PolicyLog>) -> Self {
            Self {
                log,
                fail_status: None,
                fail_role: None,
            }
        }
    }

    impl PolicyBinder for StubBinder {
        type Policy = StubPolicy;

        fn bind(&self) -> Result<StubPolicy, AudioError> {
            if let Some(status) = self.fail_status {
                return Err(AudioError::Activation { status });
            }
            self.log.binds.set(self.log.binds.get() + 1);
            Ok(StubPolicy {
                log: Rc::clone(&self.log),
                fail_role: self.fail_role,
            })
        }
    }

    #[test]
    fn toggle_picks_the_counterpart() {
        let primary = headphones();
        let secondary = speakers();
        assert_eq!(toggle_target("id-shure", &primary, &secondary).id, "id-realtek");
        assert_eq!(toggle_target("id-realtek", &primary, &secondary).id, "id-shure");
    }

    #[test]
    fn toggle_falls_back_to_primary_for_unknown_default() {
        let primary = headphones();
        let secondary = speakers();
        assert_eq!(toggle_target("id-other", &primary, &secondary).id, "id-shure");
        assert_eq!(toggle_target("", &primary, &secondary).id, "id-shure");
    }

    #[test]
    fn toggle_twice_returns_to_start_over_the_pair() {
        let primary = headphones();
        let secondary = speakers();
        for start in ["id-shure", "id-realtek"] {
            let once = toggle_target(start, &primary, &secondary);
            let twice = toggle_target(&once.id, &primary, &secondary);
            assert_eq!(twice.id, start);
        }
    }

    #[test]
    fn switch_targets_speakers_when_headphones_are_default() {
        let directory = StubDirectory::new(
            vec![headphones(), speakers(), other_mic()],
            "id-shure",
        );
        let log = Rc::new(PolicyLog::default());
        let binder = StubBinder::new(Rc::clone(&log));

        let outcome = SwitchController::new(SwitchConfig::default())
            .run(&directory, &binder)
            .unwrap();

        assert_eq!(outcome.target.id, "id-realtek");
        assert!(outcome.all_succeeded());

        let calls = log.calls.borrow();
        let roles: Vec<DeviceRole> = calls.iter().map(|(_, role)| *role).collect();
        assert_eq!(
            roles,
            vec![
                DeviceRole::Console,
                DeviceRole::Multimedia,
                DeviceRole::Communications,
            ]
        );
        assert!(calls.iter().all(|(id, _)| id == "id-realtek"));

        assert_eq!(log.binds.get(), 1);
        assert_eq!(log.releases.get(), 1);
    }

    #[test]
    fn switch_targets_headphones_from_a_third_device() {
        let directory = StubDirectory::new(
            vec![headphones(), speakers(), other_mic()],
            "id-other",
        );
        let log = Rc::new(PolicyLog::default());
        let binder = StubBinder::new(Rc::clone(&log));

        let outcome = SwitchController::new(SwitchConfig::default())
            .run(&directory, &binder)
            .unwrap();

        assert_eq!(outcome.target.id, "id-shure");
        assert!(outcome.all_succeeded());
    }

    #[test]
    fn missing_device_fails_before_any_bind() {
        let directory = StubDirectory::new(vec![headphones(), other_mic()], "id-shure");
        let log = Rc::new(PolicyLog::default());
        let binder = StubBinder::new(Rc::clone(&log));

        let err = SwitchController::new(SwitchConfig::default())
            .run(&directory, &binder)
            .unwrap_err();

        match err {
            AudioError::DeviceNotFound { missing, found } => {
                assert_eq!(missing, vec![SECONDARY_DEVICE_NAME.to_string()]);
                assert_eq!(found, vec![PRIMARY_DEVICE_NAME.to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(log.binds.get(), 0);
        assert_eq!(log.releases.get(), 0);
        assert!(log.calls.borrow().is_empty());
    }

    #[test]
    fn role_failure_is_collected_not_fatal() {
        let directory = StubDirectory::new(
            vec![headphones(), speakers(), other_mic()],
            "id-shure",
        );
        let log = Rc::new(PolicyLog::default());
        let mut binder = StubBinder::new(Rc::clone(&log));
        binder.fail_role = Some((DeviceRole::Communications, ACCESS_DENIED));

        let outcome = SwitchController::new(SwitchConfig::default())
            .run(&directory, &binder)
            .unwrap();

        assert!(!outcome.all_succeeded());
        assert_eq!(outcome.failed_roles(), vec![DeviceRole::Communications]);
        for role_outcome in &outcome.roles {
            match role_outcome.role {
                DeviceRole::Communications => {
                    assert!(matches!(
                        role_outcome.result,
                        Err(AudioError::EndpointAssignment {
                            role: DeviceRole::Communications,
                            status,
                        }) if status == ACCESS_DENIED
                    ));
                }
                _ => assert!(role_outcome.result.is_ok()),
            }
        }

        // All three roles were still attempted, and the handle went away.
        assert_eq!(log.calls.borrow().len(), 3);
        assert_eq!(log.binds.get(), 1);
        assert_eq!(log.releases.get(), 1);
    }

    #[test]
    fn bind_failure_short_circuits() {
        let directory = StubDirectory::new(
            vec![headphones(), speakers(), other_mic()],
            "id-shure",
        );
        let log = Rc::new(PolicyLog::default());
        let mut binder = StubBinder::new(Rc::clone(&log));
        binder.fail_status = Some(0x8004_0154_u32 as i32);

        let err = SwitchController::new(SwitchConfig::default())
            .run(&directory, &binder)
            .unwrap_err();

        assert!(matches!(err, AudioError::Activation { .. }));
        assert!(log.calls.borrow().is_empty());
        assert_eq!(log.binds.get(), 0);
        assert_eq!(log.releases.get(), 0);
    }

    #[test]
    fn no_default_endpoint_is_fatal_before_bind() {
        let directory = StubDirectory::new(
            vec![headphones(), speakers()],
            "id-not-present",
        );
        let log = Rc::new(PolicyLog::default());
        let binder = StubBinder::new(Rc::clone(&log));

        let err = SwitchController::new(SwitchConfig::default())
            .run(&directory, &binder)
            .unwrap_err();

        assert!(matches!(err, AudioError::NoDefaultDevice));
        assert_eq!(log.binds.get(), 0);
        assert_eq!(log.releases.get(), 0);
    }
}
