//! A counter app driven by synthetic clicks and keystrokes.
//!
//! Run with `RUST_LOG=debug VDOM_TELEMETRY=1 cargo run -p vdom --example counter`.

use anyhow::{Result, anyhow};
use core::cell::RefCell;
use core::time::Duration;
use dom::{DOM, Host as _, NodeKey};
use log::info;
use std::rc::Rc;
use vdom::{
    Actions, App, AppParams, Dispatcher, Mount, RenderConfig, TaskQueue, TokioQueue, VNode,
    attrs, h,
};

#[derive(Default)]
struct Counter {
    count: i64,
    name: String,
}

fn view(state: &Counter, actions: &Dispatcher<Counter>) -> VNode {
    let greeting = if state.name.is_empty() {
        "Hello, stranger".to_owned()
    } else {
        format!("Hello, {}", state.name)
    };
    h(
        "section",
        Some(attrs! { "class" => "counter" }),
        vec![
            h("h1", None, vec![greeting.into()]),
            h("p", None, vec![state.count.into()]),
            h(
                "button",
                Some(attrs! { "onclick" => actions.handler("down") }),
                vec!["-".into()],
            ),
            h(
                "button",
                Some(attrs! { "onclick" => actions.handler("up") }),
                vec!["+".into()],
            ),
            h(
                "input",
                Some(attrs! {
                    "value" => state.name.clone(),
                    "oninput" => actions.handler("rename"),
                }),
                vec![],
            ),
        ],
    )
}

/// Yield to the local task set until `app` has rendered `target` times.
async fn settle(app: &App<Counter, DOM>, target: u64) {
    while app.render_count() < target {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

async fn run() -> Result<()> {
    let config = RenderConfig::from_env();
    let mut document = DOM::new();
    let body = document.create_element("body");
    let root = document.create_element("div");
    document.set_attribute(root, "id", "app")?;
    document.append_child(body, root)?;
    document.append_child(NodeKey::ROOT, body)?;
    document.commit()?;
    let host = Rc::new(RefCell::new(document));

    let actions = Actions::new()
        .with("up", |state: &mut Counter, _payload| state.count += 1)
        .with("down", |state: &mut Counter, _payload| state.count -= 1)
        .with("rename", |state: &mut Counter, payload| {
            payload.unwrap_or_default().clone_into(&mut state.name);
        });
    let queue: Rc<dyn TaskQueue> = Rc::new(TokioQueue::from_config(&config));
    let app = App::new(
        AppParams {
            mount: Mount::from("#app"),
            view: Box::new(view),
            state: Counter::default(),
            actions,
        },
        Rc::clone(&host),
        queue,
        config,
    )?;
    settle(&app, 1).await;
    info!("Mounted: {}", host.borrow().to_html(app.mount()).unwrap_or_default());

    let section = host
        .borrow()
        .child_at(app.mount(), 0)
        .ok_or_else(|| anyhow!("nothing was mounted"))?;
    let (plus, input) = {
        let dom = host.borrow();
        (dom.child_at(section, 3), dom.child_at(section, 4))
    };
    let plus = plus.ok_or_else(|| anyhow!("missing + button"))?;
    let input = input.ok_or_else(|| anyhow!("missing input"))?;

    for _ in 0..3 {
        host.borrow().dispatch_event(plus, "click");
    }
    settle(&app, 2).await;
    info!("After three clicks: {}", host.borrow().to_html(section).unwrap_or_default());

    host.borrow_mut().set_user_value(input, "Ferris")?;
    host.borrow().dispatch_event(input, "input");
    settle(&app, 3).await;
    info!("After typing: {}", host.borrow().to_html(section).unwrap_or_default());
    info!("Final tree: {}", host.borrow().to_json());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run())
}
