use anyhow::Result;
use isdash_application::{IncrementalSearchController, SessionScoped};
use isdash_core::auth::AuthState;
use isdash_core::notification::NotificationSink;
use isdash_core::search::{
    ChannelQueryClassifier, IdentityQueryClassifier, PaginatedFetchService, QueryClassifier,
    SearchFilters, SearchOptions,
};
use isdash_infrastructure::{ChannelDirectory, IdentityDirectory};
use serde::Serialize;
use std::sync::Arc;

use super::context::Context;
use crate::SearchKind;

pub async fn run(kind: SearchKind, query: &str, limit: Option<usize>, mine: bool) -> Result<()> {
    let ctx = Context::load().await?;
    match kind {
        SearchKind::Identities => {
            let controller = controller(
                &ctx,
                IdentityDirectory::new(ctx.client.clone()),
                Arc::new(IdentityQueryClassifier),
                "user",
            );
            let session = ctx.session(vec![Arc::new(controller.clone()) as Arc<dyn SessionScoped>]);
            session.set_created_by_me(mine);
            let mut options = session.identity_search_options(query.is_empty()).await?;
            if let Some(limit) = limit {
                options.limit = Some(limit);
            }
            search(&controller, query, options).await
        }
        SearchKind::Channels => {
            let controller = controller(
                &ctx,
                ChannelDirectory::new(ctx.client.clone()),
                Arc::new(ChannelQueryClassifier),
                "channel",
            );
            let mut filters = SearchFilters::new();
            if mine {
                if let Some(data) = ctx.auth.current() {
                    filters = filters.with_owner(data.did);
                }
            }
            let options = SearchOptions {
                limit,
                filters,
            };
            search(&controller, query, options).await
        }
    }
}

fn controller<S: PaginatedFetchService + 'static>(
    ctx: &Context,
    service: S,
    classifier: Arc<dyn QueryClassifier>,
    subject: &'static str,
) -> IncrementalSearchController<S> {
    IncrementalSearchController::builder(
        Arc::new(service),
        ctx.auth.clone() as Arc<dyn AuthState>,
        classifier,
    )
    .with_settings(ctx.config.search.clone())
    .with_notifier(Arc::new(ctx.notifications.clone()) as Arc<dyn NotificationSink>)
    .with_subject(subject)
    .build()
}

async fn search<S>(
    controller: &IncrementalSearchController<S>,
    query: &str,
    options: SearchOptions,
) -> Result<()>
where
    S: PaginatedFetchService + 'static,
    S::Record: Serialize,
{
    controller.run(query, options).await?;
    let results = controller.results();
    for record in &results {
        println!("{}", serde_json::to_string(record)?);
    }
    tracing::info!(count = results.len(), "search complete");
    Ok(())
}
