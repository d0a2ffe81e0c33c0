use weft_behaviors::{Selection, select_next, select_previous};
use weft_core::{Component, Value, flush, patch};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let list = Component::new(vec![Box::new(Selection)])?;
    list.on_change(|state, changed| {
        if changed.contains("selected_index") {
            let index = state.get_int("selected_index").unwrap_or(-1);
            let label = usize::try_from(index)
                .ok()
                .and_then(|i| state.get_list("items").and_then(|items| items.get(i)))
                .and_then(Value::as_str)
                .unwrap_or("<none>");
            println!("cursor -> {index} ({label})");
        }
    });

    list.connect();
    list.set_state(patch! {
        items: Value::list(vec!["ant".into(), "bee".into(), "cat".into()]),
        selection_required: true,
    })?;
    flush()?;

    select_next(&list)?;
    select_next(&list)?;
    flush()?;

    select_previous(&list)?;
    flush()?;

    println!("final state: {:?}", list.state());
    Ok(())
}
