//! Cache-first dashboard loading. `on_render` is called once per state the
//! caller should display.

use tracing::{debug, info};

use crate::cache::{
    object_map_key, profile_data_key, token_namespace, SessionCache, DATA_TTL, OBJECTS_TTL,
};
use crate::enrichment::run_optional_queries;
use crate::error::DashboardError;
use crate::fetcher::fetch_profile_data;
use crate::graphql::Transport;
use crate::models::{DataMode, ObjectMap, Payload};
use crate::objects::{collect_object_ids, resolve_metadata};

/// What a command needs loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPlan {
    pub mode: DataMode,
    pub with_metadata: bool,
}

impl LoadPlan {
    pub fn new(mode: DataMode, with_metadata: bool) -> Self {
        Self {
            mode,
            with_metadata,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub payload: Payload,
    pub objects: ObjectMap,
    /// Served from cache without touching the network.
    pub from_cache: bool,
}

pub struct Loader<'a, T: Transport + ?Sized> {
    transport: &'a T,
    cache: &'a SessionCache,
    token: &'a str,
    namespace: String,
}

impl<'a, T: Transport + ?Sized> Loader<'a, T> {
    pub fn new(transport: &'a T, cache: &'a SessionCache, token: &'a str) -> Self {
        Self {
            transport,
            cache,
            token,
            namespace: token_namespace(token),
        }
    }

    fn data_key(&self, mode: DataMode) -> String {
        profile_data_key(&self.namespace, mode)
    }

    /// True when no entry is cached for this mode, which is when the caller
    /// shows its loading notice.
    pub fn is_first_load(&self, mode: DataMode) -> bool {
        !self.cache.contains(&self.data_key(mode))
    }

    pub async fn load(&self, plan: LoadPlan) -> Result<Dashboard, DashboardError> {
        self.load_with(plan, |_, _| {}).await
    }

    pub async fn load_with<F>(&self, plan: LoadPlan, mut on_render: F) -> Result<Dashboard, DashboardError>
    where
        F: FnMut(&Payload, &ObjectMap),
    {
        let data_key = self.data_key(plan.mode);

        if let Some(cached) = self.cache.read::<Payload>(&data_key, DATA_TTL) {
            let objects = self.objects_for(&cached, plan).await;
            on_render(&cached, &objects);
            if plan.mode.is_interactive() {
                debug!(mode = plan.mode.as_str(), "served from cache");
                return Ok(Dashboard {
                    payload: cached,
                    objects,
                    from_cache: true,
                });
            }
        }

        let mut payload = fetch_profile_data(self.transport, self.token, plan.mode).await?;
        self.cache.write(&data_key, &payload);

        let objects = self.objects_for(&payload, plan).await;
        on_render(&payload, &objects);

        if plan.mode == DataMode::Full {
            let cache = self.cache;
            let applied = run_optional_queries(self.transport, self.token, |patch| {
                payload.apply(patch);
                cache.write(&data_key, &payload);
                on_render(&payload, &objects);
            })
            .await;
            debug!(applied, "optional enrichment settled");
        }

        info!(mode = plan.mode.as_str(), "dashboard loaded");
        Ok(Dashboard {
            payload,
            objects,
            from_cache: false,
        })
    }

    async fn objects_for(&self, payload: &Payload, plan: LoadPlan) -> ObjectMap {
        if !plan.with_metadata {
            return ObjectMap::new();
        }
        let ids = collect_object_ids(payload);
        if ids.is_empty() {
            return ObjectMap::new();
        }

        let key = object_map_key(&self.namespace);
        if let Some(cached) = self.cache.read::<ObjectMap>(&key, OBJECTS_TTL) {
            if !cached.is_empty() {
                return cached;
            }
        }

        let objects = resolve_metadata(self.transport, self.token, &ids).await;
        if !objects.is_empty() {
            self.cache.write(&key, &objects);
        }
        objects
    }
}
