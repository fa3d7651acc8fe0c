use std::{cell::RefCell, rc::Rc};

use arbor::{ComponentRef, Key, Result, testing::Harness};
use pretty_assertions::assert_eq;

use crate::{
    form::Form,
    headless::{Step, apply},
};

fn form() -> (Rc<RefCell<Form>>, Harness) {
    let f = Rc::new(RefCell::new(Form::new()));
    let h = Harness::builder(ComponentRef::from(f.clone()))
        .size(320, 320)
        .build()
        .expect("harness");
    (f, h)
}

#[test]
fn test_form_edits_and_submits() -> Result<()> {
    let (f, mut h) = form();
    let name = h.tree().find_id("name").expect("name input");
    h.click_node(name)?;
    assert_eq!(h.type_text("ada")?, 1);
    assert_eq!(f.borrow().name, "ada");

    let submit = h.tree().find_id("submit").expect("submit");
    h.click_node(submit)?;
    assert_eq!(f.borrow().submitted, vec!["ada".to_string()]);
    assert_eq!(f.borrow().name, "");

    let status = h.tree().find_id("status").expect("status");
    assert!(h.tree()[status].is_displayed());
    assert_eq!(h.tree()[status].content(), "submitted 1");
    assert!(h.tree().find(&mut |n| n.content() == "ada").is_some());
    Ok(())
}

#[test]
fn test_form_requires_a_name() -> Result<()> {
    let (f, mut h) = form();
    let status = h.tree().find_id("status").expect("status");
    assert!(!h.tree()[status].is_displayed());
    h.click_tag("button")?;
    assert!(f.borrow().submitted.is_empty());
    assert_eq!(f.borrow().status, "a name is required");
    Ok(())
}

#[test]
fn test_form_notes_are_multiline() -> anyhow::Result<()> {
    let (f, mut h) = form();
    apply(&mut h, &Step::Click("notes".into()))?;
    apply(&mut h, &Step::Type("one".into()))?;
    apply(&mut h, &Step::Key(Key::Enter))?;
    apply(&mut h, &Step::Type("two".into()))?;
    assert_eq!(f.borrow().notes, "one\ntwo");
    let notes = h.tree().find_id("notes").expect("notes");
    assert_eq!(h.tree()[notes].editable().map(|e| e.cursor), Some(7));
    Ok(())
}

#[test]
fn test_form_swatch_is_drawn() -> Result<()> {
    let (_f, mut h) = form();
    let swatch = h.tree().find_tag("canvas").expect("swatch");
    let r = h.tree()[swatch].geometry().content;
    let img = h.driver.snapshot()?;
    let px = img.get_pixel(r.tl.x as u32, r.tl.y as u32).0;
    assert_eq!(px[3], 255);
    assert_ne!(px, [255, 255, 255, 255]);
    Ok(())
}
