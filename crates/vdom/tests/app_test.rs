//! End-to-end tests: state, actions, view, scheduler and the in-memory DOM.

use anyhow::Result;
use core::cell::RefCell;
use dom::{DOM, DOMUpdate, Host as _, NodeKey};
use std::rc::Rc;
use vdom::{
    Actions, App, AppParams, Dispatcher, ManualQueue, Mount, RenderConfig, SchedulerState,
    TokioQueue, VNode, attrs, h,
};

#[derive(Default)]
struct Counter {
    count: i32,
    label: String,
    items: Vec<String>,
}

fn view(state: &Counter, actions: &Dispatcher<Counter>) -> VNode {
    h(
        "div",
        Some(attrs! { "id" => "counter" }),
        vec![
            h("p", None, vec![state.count.into()]),
            h(
                "button",
                Some(attrs! {
                    "type" => "button",
                    "onclick" => actions.handler("up"),
                }),
                vec!["count up".into()],
            ),
            h(
                "input",
                Some(attrs! {
                    "value" => state.label.clone(),
                    "oninput" => actions.handler("label"),
                }),
                vec![],
            ),
            h(
                "ul",
                None,
                state
                    .items
                    .iter()
                    .map(|item| h("li", None, vec![item.as_str().into()]))
                    .collect(),
            ),
        ],
    )
}

fn actions() -> Actions<Counter> {
    Actions::new()
        .with("up", |state: &mut Counter, _payload| state.count += 1)
        .with("noop", |_state: &mut Counter, _payload| {})
        .with("label", |state: &mut Counter, payload| {
            payload.unwrap_or_default().clone_into(&mut state.label);
        })
        .with("truncate", |state: &mut Counter, _payload| state.items.truncate(1))
}

/// A document with an empty `<main id="app">` container.
fn document() -> Result<(Rc<RefCell<DOM>>, NodeKey)> {
    let mut dom = DOM::new();
    let main = dom.create_element("main");
    dom.set_attribute(main, "id", "app")?;
    dom.append_child(NodeKey::ROOT, main)?;
    dom.commit()?;
    Ok((Rc::new(RefCell::new(dom)), main))
}

fn start(state: Counter) -> Result<(App<Counter, DOM>, Rc<ManualQueue>, NodeKey)> {
    let (dom, main) = document()?;
    let queue = Rc::new(ManualQueue::new());
    let app = App::new(
        AppParams {
            mount: Mount::from("#app"),
            view: Box::new(view),
            state,
            actions: actions(),
        },
        dom,
        Rc::clone(&queue) as Rc<dyn vdom::TaskQueue>,
        RenderConfig::default(),
    )?;
    Ok((app, queue, main))
}

/// Live nodes of the rendered counter: (div, p, button, input, ul).
fn parts(app: &App<Counter, DOM>) -> Option<(NodeKey, NodeKey, NodeKey, NodeKey, NodeKey)> {
    let dom = app.host().borrow();
    let div = dom.child_at(app.mount(), 0)?;
    Some((
        div,
        dom.child_at(div, 0)?,
        dom.child_at(div, 1)?,
        dom.child_at(div, 2)?,
        dom.child_at(div, 3)?,
    ))
}

#[test]
fn first_render_waits_for_the_next_tick() -> Result<()> {
    let (app, queue, main) = start(Counter::default())?;
    assert_eq!(app.mount(), main);
    assert_eq!(app.scheduler_state(), SchedulerState::PendingFlush);
    assert!(app.host().borrow().children(main).is_empty());

    assert_eq!(queue.run_pending()?, 1);

    assert_eq!(app.scheduler_state(), SchedulerState::Idle);
    assert_eq!(app.render_count(), 1);
    assert!(app.last_report().is_some_and(|report| report.mounted));
    assert_eq!(
        app.host().borrow().to_html(main).as_deref(),
        Some(concat!(
            r#"<main id="app"><div id="counter"><p>0</p>"#,
            r#"<button type="button">count up</button>"#,
            r#"<input value=""></input><ul></ul></div></main>"#,
        ))
    );
    Ok(())
}

#[test]
fn synchronous_actions_coalesce_into_one_render() -> Result<()> {
    let (app, queue, _main) = start(Counter::default())?;
    queue.run_pending()?;
    let mut updates = app.host().borrow().subscribe();

    for _ in 0..3 {
        app.dispatch("up", None)?;
    }
    assert_eq!(queue.len(), 1);
    assert_eq!(app.state().count, 3);

    queue.run_pending()?;

    assert_eq!(app.render_count(), 2);
    assert!(app.last_report().is_some_and(|report| report.signals == 3));
    let batch = updates.try_recv()?;
    assert!(batch.iter().any(|update| matches!(update, DOMUpdate::CreateText { text, .. } if text == "3")));
    assert!(updates.try_recv().is_err());

    let (_div, para, ..) = parts(&app).ok_or_else(|| anyhow::anyhow!("counter not rendered"))?;
    assert_eq!(app.host().borrow().to_html(para).as_deref(), Some("<p>3</p>"));
    Ok(())
}

#[test]
fn click_listener_dispatches_action() -> Result<()> {
    let (app, queue, _main) = start(Counter::default())?;
    queue.run_pending()?;
    let (div, _para, button, ..) = parts(&app).ok_or_else(|| anyhow::anyhow!("counter not rendered"))?;

    {
        let dom = app.host().borrow();
        assert_eq!(dom.attribute(button, "onclick"), None);
        assert_eq!(dom.listener_count(button, "click"), 1);
        assert_eq!(dom.dispatch_event(button, "click"), 1);
    }
    queue.run_pending()?;

    let dom = app.host().borrow();
    assert_eq!(app.state().count, 1);
    assert_eq!(dom.child_at(div, 1), Some(button));
    assert_eq!(dom.listener_count(button, "click"), 1);
    assert_eq!(dom.to_html(div).as_deref().map(|html| html.starts_with(r#"<div id="counter"><p>1</p>"#)), Some(true));
    Ok(())
}

#[test]
fn unchanged_render_does_not_touch_the_tree() -> Result<()> {
    let (app, queue, _main) = start(Counter::default())?;
    queue.run_pending()?;
    let mut updates = app.host().borrow().subscribe();

    app.dispatch("noop", None)?;
    queue.run_pending()?;

    assert_eq!(app.render_count(), 2);
    assert!(app.last_report().is_some_and(|report| report.stats.is_noop()));
    assert!(updates.try_recv().is_err());
    Ok(())
}

#[test]
fn typed_value_flows_back_without_rebuilding_the_input() -> Result<()> {
    let (app, queue, _main) = start(Counter::default())?;
    queue.run_pending()?;
    let (_div, _para, _button, input, _list) =
        parts(&app).ok_or_else(|| anyhow::anyhow!("counter not rendered"))?;

    app.host().borrow_mut().set_user_value(input, "hel")?;
    assert_eq!(app.host().borrow().dispatch_event(input, "input"), 1);
    queue.run_pending()?;

    assert_eq!(app.state().label, "hel");
    assert!(app.last_report().is_some_and(|report| report.stats.values_set == 1 && report.stats.replaced == 0));
    assert_eq!(app.host().borrow().value_of(input), Some("hel"));

    // A render for an unrelated change keeps an in-progress edit.
    app.host().borrow_mut().set_user_value(input, "hello wor")?;
    app.dispatch("up", None)?;
    queue.run_pending()?;
    assert_eq!(app.host().borrow().value_of(input), Some("hello wor"));
    Ok(())
}

#[test]
fn shrinking_list_removes_surplus_items() -> Result<()> {
    let state = Counter {
        items: vec!["a".into(), "b".into(), "c".into()],
        ..Counter::default()
    };
    let (app, queue, _main) = start(state)?;
    queue.run_pending()?;
    let (.., list) = parts(&app).ok_or_else(|| anyhow::anyhow!("counter not rendered"))?;
    assert_eq!(app.host().borrow().children(list).len(), 3);

    app.dispatch("truncate", None)?;
    queue.run_pending()?;

    assert_eq!(app.host().borrow().to_html(list).as_deref(), Some("<ul><li>a</li></ul>"));
    assert!(app.last_report().is_some_and(|report| report.stats.removed == 2));
    Ok(())
}

#[test]
fn render_blocked_by_a_busy_host_runs_on_a_later_tick() -> Result<()> {
    let (app, queue, main) = start(Counter::default())?;
    {
        let _reader = app.host().borrow();
        assert!(queue.run_pending().is_err());
    }
    assert_eq!(app.scheduler_state(), SchedulerState::PendingFlush);
    assert_eq!(queue.len(), 1);

    app.dispatch("up", None)?;
    app.dispatch("up", None)?;
    assert_eq!(queue.len(), 1);

    queue.run_pending()?;

    assert_eq!(app.scheduler_state(), SchedulerState::Idle);
    assert_eq!(app.render_count(), 1);
    assert!(app.last_report().is_some_and(|report| report.mounted && report.signals == 3));
    let html = app.host().borrow().to_html(main).unwrap_or_default();
    assert!(html.contains("<p>2</p>"));
    Ok(())
}

#[test]
fn missing_mount_target_fails_before_rendering() -> Result<()> {
    let (dom, main) = document()?;
    let queue = Rc::new(ManualQueue::new());
    let result = App::new(
        AppParams {
            mount: Mount::from("#missing"),
            view: Box::new(view),
            state: Counter::default(),
            actions: actions(),
        },
        Rc::clone(&dom),
        Rc::clone(&queue) as Rc<dyn vdom::TaskQueue>,
        RenderConfig::default(),
    );

    let Err(err) = result else {
        anyhow::bail!("mounting on a missing target should fail");
    };
    assert_eq!(err.to_string(), "The mount target #missing was not found.");
    assert!(queue.is_empty());
    assert!(dom.borrow().children(main).is_empty());
    Ok(())
}

#[test]
fn mounts_on_a_direct_handle() -> Result<()> {
    let (dom, main) = document()?;
    let queue = Rc::new(ManualQueue::new());
    let app = App::new(
        AppParams {
            mount: Mount::Key(main),
            view: Box::new(|state: &Counter, _actions: &Dispatcher<Counter>| {
                h("span", None, vec![state.count.into()])
            }),
            state: Counter::default(),
            actions: Actions::new(),
        },
        dom,
        Rc::clone(&queue) as Rc<dyn vdom::TaskQueue>,
        RenderConfig::default(),
    )?;
    queue.run_pending()?;
    assert_eq!(app.host().borrow().to_html(main).as_deref(), Some(r#"<main id="app"><span>0</span></main>"#));
    assert!(app.dispatch("up", None).is_err());
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn renders_on_a_tokio_local_set() -> Result<()> {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (dom, main) = document()?;
            let app = App::new(
                AppParams {
                    mount: Mount::from("#app"),
                    view: Box::new(view),
                    state: Counter::default(),
                    actions: actions(),
                },
                dom,
                Rc::new(TokioQueue::new()) as Rc<dyn vdom::TaskQueue>,
                RenderConfig::default(),
            )?;
            app.dispatch("up", None)?;
            app.dispatch("up", None)?;
            assert_eq!(app.render_count(), 0);

            for _ in 0..16 {
                if app.render_count() > 0 {
                    break;
                }
                tokio::task::yield_now().await;
            }

            assert_eq!(app.render_count(), 1);
            assert!(app.last_report().is_some_and(|report| report.signals == 3));
            let html = app.host().borrow().to_html(main).unwrap_or_default();
            assert!(html.contains("<p>2</p>"));
            Ok(())
        })
        .await
}
