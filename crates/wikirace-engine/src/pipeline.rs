//! The resolver-facing half of each operation.
//!
//! Commands that reference article titles can't be validated without the
//! Article Resolver, and the resolver is slow and fallible. These methods
//! run the resolution *outside* the room actor — the room keeps ticking
//! and serving other players — and then submit the resolved change, which
//! the actor re-validates before applying. Each one starts with a cheap
//! precondition check so a doomed request never pays for a network
//! round-trip.

use wikirace_protocol::{PlayerProgress, RoomDelta, SettingsPatch, Username};
use wikirace_resolver::{ArticleResolver, PageKind, PageNamespace, Resolution, is_supported_language};

use crate::error::{GameError, RoundSlot};
use crate::room::{ResolvedSlot, RoomHandle, RoundChange, SettingsChange};

impl RoomHandle {
    /// Host-only settings mutation (round setup, rules, host transfer).
    ///
    /// Returns the validated delta that was broadcast, for the ack echo.
    pub async fn update<R: ArticleResolver>(
        &self,
        resolver: &R,
        requester: &Username,
        patch: SettingsPatch,
    ) -> Result<RoomDelta, GameError> {
        let language = self
            .precheck_settings(requester.clone(), "update")
            .await?;

        let round = match patch.current_round {
            None => None,
            Some(setup) => {
                let mut change = RoundChange::default();
                if let Some(raw) = setup.start {
                    change.start =
                        Some(resolve_slot(resolver, &language, &raw, RoundSlot::Start).await?);
                }
                if let Some(raw) = setup.target {
                    change.target =
                        Some(resolve_slot(resolver, &language, &raw, RoundSlot::Target).await?);
                }
                Some(change)
            }
        };

        let rules = match patch.rules {
            None => None,
            Some(mut rules) => {
                if let Some(banned) = rules.banned_articles.take() {
                    // Best-effort canonicalization: entries that don't
                    // resolve are dropped, not an error.
                    let resolutions = resolver.resolve_many(&banned, &language).await;
                    rules.banned_articles = Some(
                        resolutions
                            .iter()
                            .filter_map(|r| r.found().map(|a| a.title.clone()))
                            .collect(),
                    );
                }
                Some(rules)
            }
        };

        self.apply_settings(
            requester.clone(),
            SettingsChange {
                host: patch.host,
                round,
                rules,
            },
        )
        .await
    }

    /// Advances a player one article forward.
    pub async fn click<R: ArticleResolver>(
        &self,
        resolver: &R,
        username: &Username,
        article: &str,
    ) -> Result<PlayerProgress, GameError> {
        let language = self.precheck_move(username.clone()).await?;
        let resolution = resolver.resolve(article, &language).await;
        self.apply_click(username.clone(), resolution).await
    }

    /// Handles a browser "back" (or anchor) navigation.
    pub async fn navigate<R: ArticleResolver>(
        &self,
        resolver: &R,
        username: &Username,
        article: &str,
    ) -> Result<PlayerProgress, GameError> {
        let language = self.precheck_move(username.clone()).await?;
        let resolution = resolver.resolve(article, &language).await;
        self.apply_navigate(username.clone(), resolution).await
    }

    /// Switches the room to another wiki language (host only).
    pub async fn change_lang(
        &self,
        requester: &Username,
        language: &str,
    ) -> Result<RoomDelta, GameError> {
        if !is_supported_language(language) {
            return Err(GameError::InvalidLanguage(language.to_string()));
        }
        self.change_language(requester.clone(), language.to_string())
            .await
    }
}

/// Resolves a start/target pick. Unresolvable titles clear the slot (the
/// host sees an empty field, not an error); disambiguation pages and
/// non-main namespaces are rejected outright.
async fn resolve_slot<R: ArticleResolver>(
    resolver: &R,
    language: &str,
    raw: &str,
    slot: RoundSlot,
) -> Result<ResolvedSlot, GameError> {
    match resolver.resolve(raw, language).await {
        Resolution::NotFound => Ok(ResolvedSlot {
            title: String::new(),
            thumbnail: String::new(),
        }),
        Resolution::Found(article) => {
            if article.kind == PageKind::Disambiguation {
                return Err(GameError::RoundArticleDisambiguation(slot));
            }
            if article.namespace != PageNamespace::Main {
                return Err(GameError::RoundArticleNamespace(slot));
            }
            Ok(ResolvedSlot {
                title: article.title,
                thumbnail: article.thumbnail,
            })
        }
    }
}
