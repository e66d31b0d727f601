//! Addon Manager - 애드온 라이프사이클 관리
//!
//! 상태: Unloaded → Instantiated → Active → Inactive
//!
//! ## 잠금
//!
//! - `lock`: 재진입 가능한 뮤텍스. 인덱스 생성, 활성화, 비활성화, 훅 호출을 직렬화합니다.
//!   훅 안에서 다시 매니저를 호출할 수 있습니다.
//! - `records`: 레코드 테이블. 애드온 코드나 이벤트 디스패치 중에는 잡지 않습니다.
//! - `ActivationGate`: 인스턴스별 백그라운드 활성화 상태. 비활성화 훅은 항상
//!   활성화 훅이 끝난 뒤에 실행됩니다. 대기하지 않고, 실행 중이면 정리를
//!   백그라운드 태스크에 넘깁니다.

use super::traits::{Addon, AddonContext, Hook};
use super::types::{AddonSummary, IndexReport, InfoProperty, ServiceDescriptor};
use crate::host::Host;
use crate::plugin::PluginType;
use haul_foundation::{is_truthy, Error, ListenerId, Result, ACTIVATED_OPTION, CONFIG_CHANGED};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

// ============================================================================
// 내부 레코드
// ============================================================================

/// 이벤트 버스에 연결된 바인딩
struct Binding {
    method: String,
    event: String,
    listener: ListenerId,
}

struct AddonInstance {
    id: u64,
    addon: Arc<dyn Addon>,
    gate: Arc<ActivationGate>,
    bindings: Vec<Binding>,
}

impl AddonInstance {
    fn is_bound(&self, method: &str, event: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.method == method && b.event == event)
    }
}

/// 애드온별 레코드
///
/// 비활성화 시 인스턴스만 비우고 서비스/이벤트 메타데이터는 유지합니다.
#[derive(Default)]
struct AddonRecord {
    internal: bool,
    instances: Vec<AddonInstance>,
    /// `(method, event)` 대기 중인 바인딩
    events: Vec<(String, String)>,
    services: BTreeMap<String, ServiceDescriptor>,
}

// ============================================================================
// 활성화 게이트
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationState {
    /// 백그라운드 활성화 대기 중
    Pending,
    /// 활성화 훅 실행 중
    Running,
    /// 활성화 훅 종료 (또는 백그라운드 활성화 없음)
    Done,
    /// 훅 시작 전에 비활성화됨. 활성화 훅은 실행되지 않음
    Cancelled,
    /// 훅 실행 중에 비활성화됨. 훅이 끝나면 태스크가 정리를 수행
    Deferred,
}

struct ActivationGate {
    state: Mutex<ActivationState>,
}

impl ActivationGate {
    fn new(state: ActivationState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    /// 활성화 훅 시작. 이미 취소되었으면 false
    fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ActivationState::Cancelled {
            return false;
        }
        *state = ActivationState::Running;
        true
    }

    /// 활성화 훅 종료. 실행 중에 비활성화가 요청되었으면 true
    fn finish(&self) -> bool {
        let mut state = self.state.lock();
        let deferred = *state == ActivationState::Deferred;
        *state = ActivationState::Done;
        deferred
    }

    /// 백그라운드 활성화가 아직 끝나지 않았는지
    fn in_flight(&self) -> bool {
        matches!(
            *self.state.lock(),
            ActivationState::Pending | ActivationState::Running
        )
    }

    /// 비활성화 요청. 지금 바로 정리해도 되면 true
    fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            ActivationState::Pending => {
                *state = ActivationState::Cancelled;
                true
            }
            ActivationState::Running => {
                *state = ActivationState::Deferred;
                false
            }
            ActivationState::Done | ActivationState::Cancelled | ActivationState::Deferred => true,
        }
    }
}

// ============================================================================
// 실행 보호
// ============================================================================

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 애드온 코드 실행. 패닉은 `Error::Addon`으로 변환
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Addon(format!(
            "panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// 애드온 코드 실행 후 실패는 로그만 남김
fn call_logged<T>(addon: &str, method: &str, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match guarded(f) {
        Ok(value) => Some(value),
        Err(e) => {
            error!(addon = %addon, "Error executing {}: {}", method, e);
            None
        }
    }
}

/// 활성화 훅을 백그라운드에서 실행 (완료를 추적하지 않음)
///
/// 훅 실행 중에 비활성화되면 훅이 끝난 뒤 이 태스크가 정리합니다.
fn spawn_activation(
    manager: Weak<AddonManager>,
    name: String,
    addon: Arc<dyn Addon>,
    gate: Arc<ActivationGate>,
) {
    let task = move || {
        if !gate.begin() {
            debug!(addon = %name, "Addon deactivated before activation started");
            return;
        }

        if call_logged(&name, "activate", || addon.activate()).is_some() {
            debug!(addon = %name, "Addon activated");
        }

        if gate.finish() {
            if let Some(manager) = manager.upgrade() {
                let _guard = manager.lock.lock();
                manager.teardown(&name, &addon);
            }
        }
    };

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(task);
        }
        Err(_) => {
            if let Err(e) = std::thread::Builder::new()
                .name("addon-activate".to_string())
                .spawn(task)
            {
                error!("Failed to start addon activation: {}", e);
            }
        }
    }
}

// ============================================================================
// AddonManager
// ============================================================================

/// 애드온 매니저
pub struct AddonManager {
    host: Arc<Host>,
    this: Weak<AddonManager>,
    lock: ReentrantMutex<()>,
    records: Mutex<BTreeMap<String, AddonRecord>>,
    info: RwLock<HashMap<String, InfoProperty>>,
    instance_ids: AtomicU64,
    config_listener: Mutex<Option<ListenerId>>,
}

impl AddonManager {
    /// 매니저 생성 후 `config:changed` 구독
    pub fn new(host: Arc<Host>) -> Arc<Self> {
        let manager = Arc::new_cyclic(|this| Self {
            host,
            this: this.clone(),
            lock: ReentrantMutex::new(()),
            records: Mutex::new(BTreeMap::new()),
            info: RwLock::new(HashMap::new()),
            instance_ids: AtomicU64::new(0),
            config_listener: Mutex::new(None),
        });

        let weak = Arc::downgrade(&manager);
        let listener = manager.host.events.listen(
            CONFIG_CHANGED,
            Arc::new(move |args: &[Value]| {
                if let Some(manager) = weak.upgrade() {
                    manager.handle_config_event(args);
                }
            }),
        );
        *manager.config_listener.lock() = Some(listener);

        manager
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    fn is_internal(&self, name: &str) -> bool {
        self.host
            .plugins
            .load_attributes(PluginType::Addon, name)
            .get("internal")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// 클래스 로드 후 인스턴스 생성, 레코드에 추가
    fn instantiate(
        &self,
        name: &str,
        internal: bool,
        gate: Arc<ActivationGate>,
    ) -> Result<Arc<dyn Addon>> {
        let class = self.host.plugins.load_class(PluginType::Addon, name)?;
        let ctx = AddonContext::new(name, Arc::clone(&self.host), self.this.clone());
        let addon = guarded(|| class.instantiate(ctx))?;

        let id = self.instance_ids.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock();
        let record = records.entry(name.to_string()).or_default();
        record.internal = internal;
        record.instances.push(AddonInstance {
            id,
            addon: Arc::clone(&addon),
            gate,
            bindings: Vec::new(),
        });

        Ok(addon)
    }

    /// 현재 인스턴스 스냅샷
    fn instances(&self) -> Vec<(String, Arc<dyn Addon>)> {
        self.records
            .lock()
            .iter()
            .flat_map(|(name, record)| {
                record
                    .instances
                    .iter()
                    .map(move |instance| (name.clone(), Arc::clone(&instance.addon)))
            })
            .collect()
    }

    /// 게이트를 포함한 인스턴스 스냅샷
    fn gated_instances(&self) -> Vec<(String, Arc<dyn Addon>, Arc<ActivationGate>)> {
        self.records
            .lock()
            .iter()
            .flat_map(|(name, record)| {
                record.instances.iter().map(move |instance| {
                    (
                        name.clone(),
                        Arc::clone(&instance.addon),
                        Arc::clone(&instance.gate),
                    )
                })
            })
            .collect()
    }

    fn first_instance(&self, name: &str) -> Option<Arc<dyn Addon>> {
        self.records
            .lock()
            .get(name)
            .and_then(|record| record.instances.first())
            .map(|instance| Arc::clone(&instance.addon))
    }

    // ========================================================================
    // 라이프사이클
    // ========================================================================

    /// 애드온 인덱스 생성
    ///
    /// 내부 애드온과 `activated` 설정이 켜진 애드온을 인스턴스화합니다.
    pub fn build_index(&self) -> IndexReport {
        let _guard = self.lock.lock();
        let mut report = IndexReport::default();

        for (name, descriptor) in self.host.plugins.get_plugins(PluginType::Addon) {
            self.host.config.register_schema(&name, &descriptor.config);

            let internal = self.is_internal(&name);
            if !internal && !self.host.config.get_bool(&name, ACTIVATED_OPTION) {
                report.deactivated.push(name);
                continue;
            }

            if self.is_active(&name) {
                report.active.push(name);
                continue;
            }

            match self.instantiate(&name, internal, ActivationGate::new(ActivationState::Done)) {
                Ok(addon) => {
                    if internal {
                        debug!(addon = %name, "Loaded internal plugin");
                    }
                    if internal || addon.is_activated() {
                        report.active.push(name);
                    } else {
                        report.deactivated.push(name);
                    }
                }
                Err(e) => {
                    warn!(addon = %name, "Failed activating addon: {}", e);
                }
            }
        }

        info!("Activated addons: {}", report.active.join(", "));
        info!("Deactivated addons: {}", report.deactivated.join(", "));
        report
    }

    /// 애드온 활성화
    ///
    /// 이미 인스턴스가 있으면 아무것도 하지 않습니다. 활성화 훅은 백그라운드에서
    /// 실행되고 실패는 로그로만 남습니다. 인스턴스를 만든 경우 true.
    pub fn activate(&self, name: &str) -> bool {
        let _guard = self.lock.lock();

        if self.is_active(name) {
            debug!(addon = %name, "Addon already active");
            return false;
        }

        let internal = self.is_internal(name);
        let gate = ActivationGate::new(ActivationState::Pending);
        let addon = match self.instantiate(name, internal, Arc::clone(&gate)) {
            Ok(addon) => addon,
            Err(e) => {
                error!(addon = %name, "Failed activating addon: {}", e);
                return false;
            }
        };

        debug!(addon = %name, "Plugin loaded");
        spawn_activation(self.this.clone(), name.to_string(), addon, gate);
        self.register_events();
        true
    }

    /// 애드온 비활성화
    ///
    /// 내부 애드온이나 인스턴스가 없는 애드온은 무시합니다. 비활성화한 경우 true.
    /// 활성화 훅이 아직 실행 중이면 비활성화 훅과 주기 작업 정리는 활성화 훅이
    /// 끝난 뒤에 실행됩니다.
    pub fn deactivate(&self, name: &str) -> bool {
        let _guard = self.lock.lock();

        let (addon, gate) = {
            let records = self.records.lock();
            let Some(record) = records.get(name) else {
                return false;
            };
            if record.internal {
                debug!(addon = %name, "Internal addon is never deactivated");
                return false;
            }
            match record.instances.first() {
                Some(instance) => (Arc::clone(&instance.addon), Arc::clone(&instance.gate)),
                None => return false,
            }
        };

        debug!(addon = %name, "Plugin deactivated");
        if gate.cancel() {
            self.teardown(name, &addon);
        } else {
            debug!(addon = %name, "Deactivation deferred until activation hook returns");
        }

        let instances = self
            .records
            .lock()
            .get_mut(name)
            .map(|record| std::mem::take(&mut record.instances))
            .unwrap_or_default();

        let listeners: Vec<ListenerId> = instances
            .iter()
            .flat_map(|instance| instance.bindings.iter().map(|b| b.listener))
            .collect();
        let removed = self.host.events.unlisten_all(&listeners);
        debug!(addon = %name, removed, "Removed event listeners");

        true
    }

    /// 비활성화 훅 호출 후 주기 작업 취소
    fn teardown(&self, name: &str, addon: &Arc<dyn Addon>) {
        call_logged(name, "deactivate", || addon.deactivate());

        if let Some(job) = call_logged(name, "periodic_job", || Ok(addon.periodic_job())).flatten() {
            let removed = self.host.scheduler.remove_job(job);
            debug!(addon = %name, removed, "Removed periodic job");
        }
    }

    /// 시작 시 모든 인스턴스의 활성화 훅 실행
    ///
    /// 백그라운드 활성화가 진행 중인 인스턴스는 건너뜁니다.
    pub fn activate_addons(&self) {
        let _guard = self.lock.lock();
        for (name, addon, gate) in self.gated_instances() {
            if gate.in_flight() {
                debug!(addon = %name, "Activation already scheduled");
                continue;
            }
            if addon.is_activated() {
                call_logged(&name, "activate", || addon.activate());
            }
        }
        self.register_events();
    }

    /// 종료 시 모든 인스턴스의 비활성화 훅 실행
    pub fn deactivate_addons(&self) {
        let _guard = self.lock.lock();
        for (name, addon, gate) in self.gated_instances() {
            if gate.cancel() {
                call_logged(&name, "deactivate", || addon.deactivate());
            }
        }
    }

    // ========================================================================
    // 설정 변경
    // ========================================================================

    fn handle_config_event(&self, args: &[Value]) {
        let (Some(section), Some(option), Some(value)) = (
            args.first().and_then(Value::as_str),
            args.get(1).and_then(Value::as_str),
            args.get(2),
        ) else {
            return;
        };
        self.on_config_changed(section, option, value);
    }

    /// 애드온 섹션의 `activated` 변경에 반응
    pub fn on_config_changed(&self, section: &str, option: &str, value: &Value) {
        if option != ACTIVATED_OPTION || !self.host.plugins.has_plugin(PluginType::Addon, section) {
            return;
        }

        if is_truthy(value) {
            self.activate(section);
        } else {
            self.deactivate(section);
        }
    }

    // ========================================================================
    // 훅
    // ========================================================================

    /// 모든 인스턴스에 훅 호출 후 이벤트 디스패치
    ///
    /// 한 애드온의 실패는 나머지 호출과 디스패치를 막지 않습니다.
    pub fn call_in_hooks(&self, hook: &Hook, event: &str, args: &[Value]) {
        let _guard = self.lock.lock();
        for (name, addon) in self.instances() {
            call_logged(&name, hook.method(), || addon.on_hook(hook, args));
        }
        self.host.events.dispatch(event, args);
    }

    pub fn download_preparing(&self, args: &[Value]) {
        let hook = Hook::DownloadPreparing;
        self.call_in_hooks(&hook, hook.event_name(), args);
    }

    pub fn download_finished(&self, args: &[Value]) {
        let hook = Hook::DownloadFinished;
        self.call_in_hooks(&hook, hook.event_name(), args);
    }

    pub fn download_failed(&self, args: &[Value]) {
        let hook = Hook::DownloadFailed;
        self.call_in_hooks(&hook, hook.event_name(), args);
    }

    pub fn package_finished(&self, args: &[Value]) {
        let hook = Hook::PackageFinished;
        self.call_in_hooks(&hook, hook.event_name(), args);
    }

    // ========================================================================
    // 서비스
    // ========================================================================

    /// 애드온 서비스 호출
    pub fn invoke(&self, addon_name: &str, service: &str, args: &[Value]) -> Result<Value> {
        let addon = {
            let records = self.records.lock();
            let record = records
                .get(addon_name)
                .filter(|record| record.services.contains_key(service))
                .ok_or_else(|| Error::service_not_found(addon_name, service))?;
            record
                .instances
                .first()
                .map(|instance| Arc::clone(&instance.addon))
                .ok_or_else(|| Error::service_not_found(addon_name, service))?
        };

        match guarded(|| addon.call_service(service, args)) {
            Ok(value) => Ok(value),
            Err(e @ Error::ServiceNotFound { .. }) => Err(e),
            Err(e) => Err(Error::ServiceInvocation {
                addon: addon_name.to_string(),
                service: service.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 서비스 등록
    pub fn register_service(&self, addon: &str, service: ServiceDescriptor) {
        debug!(addon = %addon, service = %service.name, "Registered service");
        self.records
            .lock()
            .entry(addon.to_string())
            .or_default()
            .services
            .insert(service.name.clone(), service);
    }

    /// info 속성 등록
    pub fn register_info_property(
        &self,
        handle: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) {
        let handle = handle.into();
        self.info.write().insert(
            handle,
            InfoProperty {
                name: name.into(),
                description: description.into(),
                value: None,
            },
        );
    }

    // ========================================================================
    // 이벤트 바인딩
    // ========================================================================

    /// 이벤트 바인딩 예약 (`register_events`에서 연결됨)
    pub fn add_event_listener(&self, addon: &str, method: &str, event: &str) {
        let mut records = self.records.lock();
        let record = records.entry(addon.to_string()).or_default();
        let binding = (method.to_string(), event.to_string());
        if !record.events.contains(&binding) {
            record.events.push(binding);
        }
    }

    /// 예약된 바인딩을 모든 인스턴스에 연결 (이미 연결된 것은 건너뜀)
    pub fn register_events(&self) {
        let _guard = self.lock.lock();

        let mut pending = Vec::new();
        {
            let records = self.records.lock();
            for (name, record) in records.iter() {
                for (method, event) in &record.events {
                    for instance in &record.instances {
                        if !instance.is_bound(method, event) {
                            pending.push((
                                name.clone(),
                                instance.id,
                                Arc::downgrade(&instance.addon),
                                method.clone(),
                                event.clone(),
                            ));
                        }
                    }
                }
            }
        }

        for (name, id, addon, method, event) in pending {
            let addon_name = name.clone();
            let handler = method.clone();
            let listener = self.host.events.listen(
                event.clone(),
                Arc::new(move |args: &[Value]| {
                    if let Some(addon) = addon.upgrade() {
                        call_logged(&addon_name, &handler, || addon.on_event(&handler, args));
                    }
                }),
            );

            let attached = {
                let mut records = self.records.lock();
                match records
                    .get_mut(&name)
                    .and_then(|record| record.instances.iter_mut().find(|i| i.id == id))
                {
                    Some(instance) => {
                        instance.bindings.push(Binding {
                            method,
                            event,
                            listener,
                        });
                        true
                    }
                    None => false,
                }
            };

            if !attached {
                self.host.events.unlisten(listener);
            }
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 인스턴스가 있는지
    pub fn is_active(&self, name: &str) -> bool {
        self.records
            .lock()
            .get(name)
            .is_some_and(|record| !record.instances.is_empty())
    }

    /// 연결된 이벤트 리스너 수
    pub fn listener_count(&self, name: &str) -> usize {
        self.records.lock().get(name).map_or(0, |record| {
            record
                .instances
                .iter()
                .map(|instance| instance.bindings.len())
                .sum()
        })
    }

    /// 활성 상태인 애드온 인스턴스
    pub fn active_addons(&self) -> Vec<Arc<dyn Addon>> {
        self.instances()
            .into_iter()
            .map(|(_, addon)| addon)
            .filter(|addon| addon.is_activated())
            .collect()
    }

    /// 모든 레코드 요약
    pub fn iter_addons(&self) -> Vec<AddonSummary> {
        self.records
            .lock()
            .iter()
            .map(|(name, record)| AddonSummary {
                name: name.clone(),
                internal: record.internal,
                active: !record.instances.is_empty(),
                instances: record.instances.len(),
                services: record.services.keys().cloned().collect(),
                events: record.events.clone(),
            })
            .collect()
    }

    /// 애드온의 현재 info 속성
    pub fn get_info(&self, addon_name: &str) -> Vec<InfoProperty> {
        let Some(addon) = self.first_instance(addon_name) else {
            return Vec::new();
        };
        let values = call_logged(addon_name, "info_properties", || Ok(addon.info_properties()))
            .unwrap_or_default();

        let registered = self.info.read();
        values
            .into_iter()
            .map(|(handle, value)| {
                let mut property = registered.get(&handle).cloned().unwrap_or(InfoProperty {
                    name: handle,
                    description: String::new(),
                    value: None,
                });
                property.value = Some(value);
                property
            })
            .collect()
    }

    /// 애드온별 등록된 서비스
    pub fn all_services(&self) -> BTreeMap<String, Vec<ServiceDescriptor>> {
        self.records
            .lock()
            .iter()
            .filter(|(_, record)| !record.services.is_empty())
            .map(|(name, record)| (name.clone(), record.services.values().cloned().collect()))
            .collect()
    }

    /// 활성 애드온별 info 속성
    pub fn all_info(&self) -> BTreeMap<String, Vec<InfoProperty>> {
        let names: Vec<String> = self
            .records
            .lock()
            .iter()
            .filter(|(_, record)| !record.instances.is_empty())
            .map(|(name, _)| name.clone())
            .collect();

        names
            .into_iter()
            .map(|name| {
                let info = self.get_info(&name);
                (name, info)
            })
            .filter(|(_, info)| !info.is_empty())
            .collect()
    }
}

impl Drop for AddonManager {
    fn drop(&mut self) {
        if let Some(listener) = self.config_listener.get_mut().take() {
            self.host.events.unlisten(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_gate_transitions() {
        // 시작 전 취소: 훅은 실행되지 않고 바로 정리 가능
        let gate = ActivationGate::new(ActivationState::Pending);
        assert!(gate.in_flight());
        assert!(gate.cancel());
        assert!(!gate.begin());
        assert!(!gate.in_flight());

        // 실행 중 취소: 정리는 훅이 끝난 뒤로 미뤄짐
        let gate = ActivationGate::new(ActivationState::Pending);
        assert!(gate.begin());
        assert!(!gate.cancel());
        assert!(gate.finish());
        assert!(!gate.in_flight());

        // 정상 종료 후 취소
        let gate = ActivationGate::new(ActivationState::Pending);
        assert!(gate.begin());
        assert!(!gate.finish());
        assert!(gate.cancel());
    }

    #[test]
    fn test_guarded_catches_panic() {
        let result: Result<()> = guarded(|| panic!("boom"));
        match result {
            Err(Error::Addon(message)) => assert!(message.contains("boom")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_call_logged_returns_none_on_error() {
        let value = call_logged("Stats", "activate", || -> Result<u32> {
            Err(Error::Addon("failed".into()))
        });
        assert!(value.is_none());
        assert_eq!(call_logged("Stats", "activate", || Ok(3)), Some(3));
    }
}
