//! Host - 애드온에 주입되는 호스트 협력자 묶음

use crate::plugin::PluginManager;
use haul_foundation::{ConfigStore, EventBus, JobScheduler, Scheduler};
use std::sync::Arc;

/// 호스트 애플리케이션 컨텍스트
pub struct Host {
    pub events: Arc<EventBus>,
    pub config: Arc<ConfigStore>,
    pub scheduler: Arc<dyn Scheduler>,
    pub plugins: Arc<PluginManager>,
}

impl Host {
    /// 새 이벤트 버스, 빈 설정, tokio 스케줄러로 생성
    pub fn new(plugins: Arc<PluginManager>) -> Self {
        let events = Arc::new(EventBus::new());
        let config = Arc::new(ConfigStore::new(Arc::clone(&events)));
        Self::with_parts(config, Arc::new(JobScheduler::new()), plugins)
    }

    /// 기존 설정 저장소 사용 (이벤트 버스는 설정 저장소의 것을 공유)
    pub fn with_parts(
        config: Arc<ConfigStore>,
        scheduler: Arc<dyn Scheduler>,
        plugins: Arc<PluginManager>,
    ) -> Self {
        Self {
            events: Arc::clone(config.events()),
            config,
            scheduler,
            plugins,
        }
    }
}
