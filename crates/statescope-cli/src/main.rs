use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use statescope_core::impls::TracingObserver;
use statescope_core::typed::{register_typed, state_as};
use statescope_core::{IdStrategy, Middleware, Scope, ScopeRef, Store, StoreConfig, from_fn};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TodoList {
    items: Vec<String>,
    done: usize,
}

/// Adds a `reset` action to every scope it is attached to.
struct Resettable {
    initial: Value,
}

impl Middleware for Resettable {
    fn post_setup(&self, scope: &Scope) {
        let initial = self.initial.clone();
        let registered = scope.register_action(
            "reset",
            from_fn(move |_, _, settle| {
                settle.resolve(initial.clone());
            }),
        );
        if let Err(e) = registered {
            tracing::warn!(scope = %scope.name(), "reset not added: {e}");
        }
    }
}

fn load_config() -> Result<StoreConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(StoreConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(StoreConfig {
            ids: IdStrategy::Sequential,
            ..StoreConfig::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) store（observer は全イベントを tracing に流す）
    let store = Store::builder()
        .config(load_config()?)
        .observer(Arc::new(TracingObserver))
        .build()?;

    // (B) counter scope: add は await せずに連続で投げても FIFO で実行される
    let middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(Resettable { initial: json!(0) })];
    let counter = store.create_scope(Some("counter"), json!(0), middleware)?;
    let add = counter.register_action(
        "add",
        from_fn(|state, props, settle| {
            settle.resolve(state.as_i64().unwrap_or(0) + props.as_i64().unwrap_or(0));
        }),
    )?;
    counter.subscribe(
        |event| {
            info!(
                old = %event.old_state,
                new = %event.new_state,
                "counter changed"
            );
        },
        &["add"],
    )?;

    let first = add.dispatch(json!(5));
    let second = add.dispatch(json!(3));
    first.await?;
    info!(state = %second.await?, "counter after back-to-back adds");

    // (C) typed scope
    let empty = serde_json::to_value(TodoList::default())?;
    let middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(Resettable {
        initial: empty.clone(),
    })];
    let todos = store.create_scope(Some("todos"), empty, middleware)?;
    register_typed(&todos, "add", |mut list: TodoList, item: String, settle| {
        list.items.push(item);
        settle.resolve(list);
    })?;
    register_typed(&todos, "complete", |mut list: TodoList, _: Value, settle| {
        if list.done >= list.items.len() {
            settle.reject("nothing left to complete");
            return;
        }
        list.done += 1;
        settle.resolve(list);
    })?;

    let mirror = Arc::new(Mutex::new(Map::new()));
    todos.synchronize(mirror.clone(), None, None)?;

    todos.dispatch("add", json!("write docs"))?.await?;
    todos.dispatch("complete", Value::Null)?.await?;
    if let Err(rejection) = todos.dispatch("complete", Value::Null)?.await {
        info!(reason = %rejection.reason, "second completion rejected");
    }
    let list: TodoList = state_as(&todos)?;
    info!(items = ?list.items, done = list.done, mirrored = ?mirror.lock().get("done"), "todos");

    // (D) composite: reset は両方の子に fan-out される
    let app = store.compose_scope(
        "app",
        [ScopeRef::from(&counter), ScopeRef::from("todos")],
        Vec::new(),
    )?;
    info!(actions = ?app.supported_actions(), "composite ready");
    app.dispatch("reset", Value::Null)?.await?;

    println!("{}", serde_json::to_string_pretty(&store.get_state())?);
    Ok(())
}
