//! Todo Tree - Registry, placement and event propagation end to end
//!
//! This demo builds a small todo list:
//! - A `TodoList` view that declares an `item` sub-view config placed into its `ul`
//! - `Item` views constructed from options and rendered into the list
//! - A `save` event bubbled from an item, once stopped and once not
//! - A `refresh` event descended from the root
//!
//! Run with: cargo run --example todo_tree

use std::rc::Rc;

use serde_json::{Value, json};
use spark_views::{
    ChildConfig, Event, Handler, Options, RenderOptions, Result, View, ViewClass, ViewContext,
    ViewError, ViewTree, options,
};

struct TodoList;

impl View for TodoList {
    fn render(&mut self, cx: &mut ViewContext<'_>) -> Result<()> {
        let Some(el) = cx.el() else {
            return Ok(());
        };
        let doc = cx.tree.document_mut();
        if doc.children(el).is_empty() {
            let list = doc.create_element("ul");
            doc.append(el, list);
        }
        Ok(())
    }

    fn handle_event(&mut self, handler: &str, _cx: &mut ViewContext<'_>, event: &Event) -> bool {
        if handler != "onSave" {
            return false;
        }
        println!("  list saw '{}' from {:?}", event.name, event.origin);
        true
    }
}

struct Item {
    title: String,
    done: bool,
}

impl View for Item {
    fn render(&mut self, cx: &mut ViewContext<'_>) -> Result<()> {
        let mark = if self.done { "x" } else { " " };
        cx.set_text(format!("[{mark}] {}", self.title));
        Ok(())
    }

    fn invoke(&mut self, name: &str, cx: &mut ViewContext<'_>, _args: &[Value]) -> bool {
        if name != "toggle" {
            return false;
        }
        self.done = !self.done;
        let _ = self.render(cx);
        true
    }
}

fn item_class() -> Rc<ViewClass> {
    Rc::new(
        ViewClass::new("Item", |opts: &Options| {
            Box::new(Item {
                title: opts
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("untitled")
                    .to_string(),
                done: false,
            })
        })
        .tag_name("li"),
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== spark-views Todo Tree ===\n");

    let list_class = Rc::new(
        ViewClass::new("TodoList", |_| Box::new(TodoList))
            .sub_view("item", ChildConfig::new(item_class()).location("ul"))
            .view_event("save", "onSave"),
    );

    let mut tree = ViewTree::new();
    let list = tree.create_view(&list_class, options(json!({ "id": "todos" })), None)?;
    let body = tree.document().body();
    tree.place(list, body, false)?;
    tree.render(list)?;

    let subs = tree.subs(list).ok_or(ViewError::UnknownView(list))?;
    for title in ["write docs", "build registry", "ship"] {
        subs.add_options(&mut tree, "item", options(json!({ "title": title })), None)?;
    }
    subs.render(&mut tree, RenderOptions::default())?;

    println!("Rendered:\n  {}\n", tree.document().to_markup(body));

    let items = subs.get_by_type("item");
    let second = items[1];

    println!("Bubbling 'save' from the second item:");
    tree.trigger_bubble(second, "save", vec![json!("draft")]);

    println!("Stopping 'save' on the second item, then bubbling again:");
    tree.stop_event(second, "save");
    tree.trigger_bubble(second, "save", vec![]);
    println!("  (nothing reached the list)\n");

    tree.on(
        list,
        "refresh",
        Handler::func(|_, me, _| println!("  refresh reached {me}")),
    );
    for &item in &items {
        tree.on(
            item,
            "refresh",
            Handler::func(|tree, me, _| {
                println!("  refresh reached {me} ({:?})", tree.view_type(me));
            }),
        );
    }
    println!("Descending 'refresh' from the list:");
    tree.trigger_descend(list, "refresh", vec![]);

    println!("\nToggling every item through descend:");
    subs.descend(&mut tree, "toggle", &[]);
    println!("  {}\n", tree.document().to_markup(body));

    println!("Removing the first item:");
    subs.remove(&mut tree, items[0], false);
    println!("  {} items left, first is alive: {}", subs.len(), tree.contains(items[0]));
    println!("  {}", tree.document().to_markup(body));

    Ok(())
}
