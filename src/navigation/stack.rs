//! Navigation Stack
//!
//! Per-scope LIFO of section keys. An empty stack means "at root". Every
//! transition emits drop for the section being left, then enter for the
//! section being entered.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::{SectionEvent, SectionListener};
use crate::error::{CallError, CallResult};
use crate::primitives::{NavChain, SectionKey};
use crate::scope::Scope;

#[derive(Clone, Copy)]
enum Notify {
    Enter,
    Drop,
}

pub struct NavigationStack {
    tier: String,
    stacks: DashMap<Scope, Arc<Mutex<Vec<SectionKey>>>>,
    listener: OnceLock<Weak<dyn SectionListener>>,
}

impl NavigationStack {
    pub fn new(tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            stacks: DashMap::new(),
            listener: OnceLock::new(),
        }
    }

    /// Attach the single transition listener. A stack accepts exactly one.
    pub fn attach(&self, listener: Weak<dyn SectionListener>) -> CallResult<()> {
        self.listener
            .set(listener)
            .map_err(|_| CallError::usage(format!("{}::NavigationStack already has a listener", self.tier)))
    }

    fn entries(&self, scope: &Scope) -> Arc<Mutex<Vec<SectionKey>>> {
        self.stacks.entry(scope.clone()).or_default().clone()
    }

    fn with_entries<R>(&self, scope: &Scope, f: impl FnOnce(&mut Vec<SectionKey>) -> R) -> R {
        let entries = self.entries(scope);
        let mut guard = entries.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Read without allocating state for an unknown scope
    fn peek<R: Default>(&self, scope: &Scope, f: impl FnOnce(&[SectionKey]) -> R) -> R {
        let Some(entries) = self.stacks.get(scope).map(|e| e.value().clone()) else {
            return R::default();
        };
        let guard = entries.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Top of the stack, `None` when at root
    pub fn current(&self, scope: &Scope) -> Option<SectionKey> {
        self.peek(scope, |entries| entries.last().cloned())
    }

    /// Snapshot, bottom to top
    pub fn sections(&self, scope: &Scope) -> Vec<SectionKey> {
        self.peek(scope, |entries| entries.to_vec())
    }

    /// Number of scopes holding stack state
    pub fn scope_count(&self) -> usize {
        self.stacks.len()
    }

    pub fn chain(&self, scope: &Scope) -> NavChain {
        NavChain::new(self.sections(scope))
    }

    /// Rendered chain, e.g. `->a:b`
    pub fn path(&self, scope: &Scope) -> String {
        self.chain(scope).to_string()
    }

    /// Make `key` the current section.
    ///
    /// No-op when `key` already is the top, or when the stack is empty and
    /// `key` is root. The back sentinel is routed to [`go_back`](Self::go_back).
    /// The stack only moves once the previous section was dropped; a failed
    /// enter puts the previous section back.
    pub async fn go(
        &self,
        key: &SectionKey,
        scope: &Scope,
        local_only: bool,
        token: &CancellationToken,
    ) -> CallResult<()> {
        if key.is_back() {
            return self.go_back(scope, local_only, token).await;
        }

        let top = self.current(scope);
        if top.as_ref() == Some(key) || (top.is_none() && key.is_root()) {
            return Ok(());
        }
        let previous = top.clone().unwrap_or_else(SectionKey::root);

        self.notify(Notify::Drop, &previous, scope, local_only, token).await?;
        self.with_entries(scope, |entries| {
            if top.is_some() {
                entries.pop();
            }
            entries.push(key.clone());
        });

        if let Err(err) = self.notify(Notify::Enter, key, scope, local_only, token).await {
            self.with_entries(scope, |entries| {
                entries.pop();
                entries.extend(top);
            });
            self.reenter(&previous, scope, local_only, token).await;
            return Err(err);
        }

        trace!("{}::NavigationStack: go({}, {}) DONE.", self.tier, key, scope);
        Ok(())
    }

    /// Leave the current section and re-enter the one below it (or root)
    pub async fn go_back(&self, scope: &Scope, local_only: bool, token: &CancellationToken) -> CallResult<()> {
        let popped = self.peek(scope, |entries| match entries {
            [.., below, top] => Some((top.clone(), below.clone())),
            [top] => Some((top.clone(), SectionKey::root())),
            [] => None,
        });

        let Some((dropped, next)) = popped else {
            return Ok(());
        };

        self.notify(Notify::Drop, &dropped, scope, local_only, token).await?;
        self.with_entries(scope, |entries| entries.pop());

        if let Err(err) = self.notify(Notify::Enter, &next, scope, local_only, token).await {
            self.with_entries(scope, |entries| entries.push(dropped.clone()));
            self.reenter(&dropped, scope, local_only, token).await;
            return Err(err);
        }

        trace!("{}::NavigationStack: go_back({}) DONE.", self.tier, scope);
        Ok(())
    }

    /// Undo the drop of a failed transition; the transition's error is the one reported
    async fn reenter(&self, key: &SectionKey, scope: &Scope, local_only: bool, token: &CancellationToken) {
        if let Err(e) = self.notify(Notify::Enter, key, scope, local_only, token).await {
            warn!("{}::NavigationStack: re-enter({}) [{}] FAILED: {}", self.tier, key, scope, e);
        }
    }

    /// Enter root without touching the stack
    pub async fn init(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.notify(Notify::Enter, &SectionKey::root(), scope, true, token).await
    }

    /// Drop every section top-down, then root. Always local.
    pub async fn clear(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        while let Some(key) = self.with_entries(scope, |entries| entries.pop()) {
            self.notify(Notify::Drop, &key, scope, true, token).await?;
        }
        self.notify(Notify::Drop, &SectionKey::root(), scope, true, token).await
    }

    async fn notify(
        &self,
        kind: Notify,
        key: &SectionKey,
        scope: &Scope,
        local_only: bool,
        token: &CancellationToken,
    ) -> CallResult<()> {
        let Some(listener) = self.listener.get().and_then(Weak::upgrade) else {
            return Ok(());
        };

        let event = SectionEvent {
            key: key.clone(),
            scope: scope.clone(),
            local_only,
        };

        match kind {
            Notify::Enter => {
                trace!("{}::NavigationStack: Required ENTER for ({}) [{}]", self.tier, key, scope);
                listener.on_enter(&event, token).await
            }
            Notify::Drop => {
                trace!("{}::NavigationStack: Required DROP for ({}) [{}]", self.tier, key, scope);
                listener.on_drop(&event, token).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::UserId;
    use async_trait::async_trait;

    /// Records every notification as "enter:key" / "drop:key"
    /// A notification matching `fail` is rejected and not recorded.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
        fail: Mutex<Option<String>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }

        fn fail_on(&self, event: Option<&str>) {
            *self.fail.lock().unwrap() = event.map(String::from);
        }

        fn record(&self, event: String) -> CallResult<()> {
            if self.fail.lock().unwrap().as_deref() == Some(event.as_str()) {
                return Err(CallError::transport("listener", "refused"));
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    #[async_trait]
    impl SectionListener for Recorder {
        async fn on_enter(&self, event: &SectionEvent, _token: &CancellationToken) -> CallResult<()> {
            self.record(format!("enter:{}", event.key.name()))
        }

        async fn on_drop(&self, event: &SectionEvent, _token: &CancellationToken) -> CallResult<()> {
            self.record(format!("drop:{}", event.key.name()))
        }
    }

    fn setup() -> (NavigationStack, Arc<Recorder>, Scope) {
        let stack = NavigationStack::new("test");
        let recorder = Arc::new(Recorder::default());
        let listener: Arc<dyn SectionListener> = recorder.clone();
        stack.attach(Arc::downgrade(&listener)).unwrap();
        // keep the listener alive through the recorder's Arc
        drop(listener);
        (stack, recorder, Scope::new(UserId::new(), "shell"))
    }

    #[tokio::test]
    async fn test_go_drops_previous_then_enters() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["drop:root", "enter:s1"]);

        stack.go(&"s2".into(), &scope, false, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["drop:s1", "enter:s2"]);
        assert_eq!(stack.path(&scope), "->s2");
    }

    #[tokio::test]
    async fn test_go_to_current_top_is_silent() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&SectionKey::root(), &scope, false, &token).await.unwrap();
        assert!(recorder.take().is_empty());

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        recorder.take();
        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_go_back_on_empty_stack_is_silent() {
        let (stack, recorder, scope) = setup();
        stack.go_back(&scope, false, &CancellationToken::new()).await.unwrap();
        assert!(recorder.take().is_empty());
        assert_eq!(stack.current(&scope), None);
    }

    #[tokio::test]
    async fn test_go_back_reenters_root() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        recorder.take();
        stack.go_back(&scope, false, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["drop:s1", "enter:root"]);
        assert_eq!(stack.path(&scope), "->");
    }

    #[tokio::test]
    async fn test_back_sentinel_never_stored() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        stack.go(&SectionKey::back(), &scope, false, &token).await.unwrap();
        assert!(stack.sections(&scope).is_empty());
        assert_eq!(recorder.take(), vec!["drop:root", "enter:s1", "drop:s1", "enter:root"]);
    }

    #[tokio::test]
    async fn test_go_after_go_back() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        stack.go_back(&scope, false, &token).await.unwrap();
        recorder.take();

        // the new top is root: going there again is a no-op
        stack.go(&SectionKey::root(), &scope, false, &token).await.unwrap();
        assert!(recorder.take().is_empty());

        // the popped key is a fresh transition
        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["drop:root", "enter:s1"]);
        assert_eq!(stack.path(&scope), "->s1");
    }

    #[tokio::test]
    async fn test_init_and_clear() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.init(&scope, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["enter:root"]);
        assert!(stack.sections(&scope).is_empty());

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        recorder.take();
        stack.clear(&scope, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["drop:s1", "drop:root"]);
        assert!(stack.sections(&scope).is_empty());
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let (stack, _recorder, scope) = setup();
        let other = Scope::new(scope.user, "dom");
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        assert_eq!(stack.path(&scope), "->s1");
        assert_eq!(stack.path(&other), "->");
    }

    #[tokio::test]
    async fn test_failed_drop_leaves_stack_untouched() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        recorder.take();

        recorder.fail_on(Some("drop:s1"));
        assert!(stack.go(&"s2".into(), &scope, false, &token).await.is_err());
        assert_eq!(stack.path(&scope), "->s1");
        assert!(recorder.take().is_empty());

        // retrying once the listener recovers is a real transition
        recorder.fail_on(None);
        stack.go(&"s2".into(), &scope, false, &token).await.unwrap();
        assert_eq!(recorder.take(), vec!["drop:s1", "enter:s2"]);
        assert_eq!(stack.path(&scope), "->s2");
    }

    #[tokio::test]
    async fn test_failed_enter_restores_previous() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        recorder.take();

        recorder.fail_on(Some("enter:s2"));
        assert!(stack.go(&"s2".into(), &scope, false, &token).await.is_err());
        assert_eq!(stack.path(&scope), "->s1");
        assert_eq!(recorder.take(), vec!["drop:s1", "enter:s1"]);

        recorder.fail_on(None);
        stack.go(&"s2".into(), &scope, false, &token).await.unwrap();
        assert_eq!(stack.path(&scope), "->s2");
    }

    #[tokio::test]
    async fn test_failed_go_back_keeps_top() {
        let (stack, recorder, scope) = setup();
        let token = CancellationToken::new();

        stack.go(&"s1".into(), &scope, false, &token).await.unwrap();
        recorder.take();

        recorder.fail_on(Some("drop:s1"));
        assert!(stack.go_back(&scope, false, &token).await.is_err());
        assert_eq!(stack.path(&scope), "->s1");
        assert!(recorder.take().is_empty());

        recorder.fail_on(Some("enter:root"));
        assert!(stack.go_back(&scope, false, &token).await.is_err());
        assert_eq!(stack.path(&scope), "->s1");
        assert_eq!(recorder.take(), vec!["drop:s1", "enter:s1"]);
    }

    #[tokio::test]
    async fn test_queries_do_not_allocate_scopes() {
        let (stack, _recorder, scope) = setup();
        assert_eq!(stack.current(&scope), None);
        assert_eq!(stack.path(&scope), "->");
        assert_eq!(stack.scope_count(), 0);
    }

    #[test]
    fn test_second_listener_rejected() {
        let (stack, recorder, _) = setup();
        let listener: Arc<dyn SectionListener> = recorder;
        let err = stack.attach(Arc::downgrade(&listener)).unwrap_err();
        assert!(matches!(err, CallError::Usage(_)));
    }
}
