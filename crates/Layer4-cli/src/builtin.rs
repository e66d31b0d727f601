//! Built-in plugins shipped with the haul binary
//!
//! - `BasePlugin`: 매칭되지 않은 URL을 받는 기본 hoster
//! - `Statistics`: 다운로드 결과를 세는 애드온

use haul_core::{
    Addon, AddonContext, Hook, ModuleCatalog, PluginClass, PluginDescriptor, PluginType,
    ServiceDescriptor, StaticSource, DEFAULT_PLUGIN,
};
use haul_foundation::{is_truthy, ConfigOption, Error, Result, ACTIVATED_OPTION};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const STATISTICS: &str = "Statistics";

/// 다운로드 완료/실패 카운터
struct Statistics {
    ctx: AddonContext,
    finished: AtomicU64,
    failed: AtomicU64,
}

impl Addon for Statistics {
    fn name(&self) -> &str {
        self.ctx.name()
    }

    fn is_activated(&self) -> bool {
        self.ctx
            .config(ACTIVATED_OPTION)
            .is_some_and(|v| is_truthy(&v))
    }

    fn on_hook(&self, hook: &Hook, _args: &[Value]) -> Result<()> {
        match hook {
            Hook::DownloadFinished => {
                self.finished.fetch_add(1, Ordering::Relaxed);
            }
            Hook::DownloadFailed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        Ok(())
    }

    fn call_service(&self, method: &str, _args: &[Value]) -> Result<Value> {
        match method {
            "summary" => Ok(json!({
                "finished": self.finished.load(Ordering::Relaxed),
                "failed": self.failed.load(Ordering::Relaxed),
            })),
            _ => Err(Error::service_not_found(STATISTICS, method)),
        }
    }

    fn info_properties(&self) -> Vec<(String, Value)> {
        vec![
            (
                "finished".to_string(),
                json!(self.finished.load(Ordering::Relaxed)),
            ),
            ("failed".to_string(), json!(self.failed.load(Ordering::Relaxed))),
        ]
    }
}

fn statistics_class() -> PluginClass {
    PluginClass::addon(STATISTICS, |ctx: AddonContext| {
        if let Some(manager) = ctx.manager() {
            manager.register_service(
                STATISTICS,
                ServiceDescriptor::new("summary")
                    .with_label("Summary")
                    .with_description("Finished and failed download counters"),
            );
            manager.register_info_property("finished", "Finished", "Finished downloads");
            manager.register_info_property("failed", "Failed", "Failed downloads");
        }

        let addon: Arc<dyn Addon> = Arc::new(Statistics {
            ctx,
            finished: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });
        Ok(addon)
    })
}

/// 내장 플러그인 소스
pub fn source() -> StaticSource {
    StaticSource::new("builtin")
        .with_handler(
            PluginDescriptor::new(PluginType::Hoster, DEFAULT_PLUGIN)
                .with_description("Generic fallback handler"),
        )
        .with_addon(
            PluginDescriptor::new(PluginType::Addon, STATISTICS)
                .with_category("tools")
                .with_description("Counts finished and failed downloads")
                .with_option(ConfigOption::activated(true)),
            statistics_class(),
        )
}

/// 사용자 매니페스트가 연결할 수 있는 내장 코드
pub fn catalog() -> ModuleCatalog {
    let catalog = ModuleCatalog::new();
    catalog.register("statistics", vec![statistics_class()]);
    catalog.register(
        "base",
        vec![PluginClass::handler(PluginType::Hoster, DEFAULT_PLUGIN)],
    );
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_core::{AddonManager, Host, PluginManager, PluginManagerConfig, PluginSource};

    fn manager() -> Arc<AddonManager> {
        let plugins = Arc::new(PluginManager::with_sources(
            vec![Arc::new(source()) as Arc<dyn PluginSource>],
            PluginManagerConfig::default(),
        ));
        AddonManager::new(Arc::new(Host::new(plugins)))
    }

    #[test]
    fn test_statistics_counts_downloads() {
        let manager = manager();
        let report = manager.build_index();
        assert_eq!(report.active, vec![STATISTICS]);

        manager.download_finished(&[json!(1)]);
        manager.download_finished(&[json!(2)]);
        manager.download_failed(&[json!(3)]);

        let summary = manager.invoke(STATISTICS, "summary", &[]).unwrap();
        assert_eq!(summary, json!({"finished": 2, "failed": 1}));

        let info = manager.get_info(STATISTICS);
        assert_eq!(info[0].name, "Finished");
        assert_eq!(info[0].value, Some(json!(2)));
    }

    #[test]
    fn test_catalog_entries() {
        let catalog = catalog();
        assert!(catalog.contains("statistics"));
        assert!(catalog.contains("base"));
    }
}
