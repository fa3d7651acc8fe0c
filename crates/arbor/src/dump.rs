use std::io::{self, Write};

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::{
    error::{Error, Result},
    node::{Interaction, Node, NodeId},
    tree::Tree,
};

/// Render a tree as indented text with ANSI colors: one line per node with
/// its tag, owner, content and live state. This is a debug function.
pub fn dump(tree: &Tree) -> Result<String> {
    render(tree, Buffer::ansi())
}

/// Render a tree as indented plain text.
pub fn dump_plain(tree: &Tree) -> Result<String> {
    render(tree, Buffer::no_color())
}

/// Dump into a buffer and return its contents.
fn render(tree: &Tree, mut buffer: Buffer) -> Result<String> {
    dump_node(&mut buffer, tree, tree.root(), 0)
        .map_err(|e| Error::Internal(format!("dump: {e}")))?;
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}

/// Write text in a color.
fn colored(buffer: &mut Buffer, spec: &ColorSpec, text: &str) -> io::Result<()> {
    buffer.set_color(spec)?;
    write!(buffer, "{text}")?;
    buffer.reset()
}

/// The live state of a node, as `key=value` pairs.
fn state(node: &Node) -> Vec<String> {
    let mut out = Vec::new();
    if node.interaction() != Interaction::Idle {
        out.push(format!("{:?}", node.interaction()).to_lowercase());
    }
    if let Some(ed) = node.editable() {
        out.push(format!("cursor={}", ed.cursor));
        if ed.focused {
            out.push("focused".into());
        }
    }
    if let Some(s) = node.scrollable()
        && s.line > 0
    {
        out.push(format!("line={}/{}", s.line, s.lines));
    }
    if node.debug() {
        out.push("debug".into());
    }
    out
}

/// Dump a node and its children.
fn dump_node(buffer: &mut Buffer, tree: &Tree, id: NodeId, level: usize) -> io::Result<()> {
    let Some(node) = tree.get(id) else {
        return Ok(());
    };
    let indent = "    ".repeat(level);
    write!(buffer, "{indent}")?;
    colored(
        buffer,
        ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true),
        node.tag(),
    )?;
    if node.source_tag() != node.tag() {
        write!(buffer, " <{}>", node.source_tag())?;
    }
    colored(
        buffer,
        ColorSpec::new().set_fg(Some(Color::Green)),
        &format!(" [{}]", node.owner_name()),
    )?;
    if !node.is_displayed() {
        colored(
            buffer,
            ColorSpec::new().set_fg(Some(Color::Yellow)),
            " (hidden)",
        )?;
    }
    let state = state(node);
    if !state.is_empty() {
        write!(buffer, " {}", state.join(" "))?;
    }
    if !node.content().is_empty() {
        write!(buffer, " {:?}", node.content())?;
    }
    writeln!(buffer)?;
    for child in node.children() {
        dump_node(buffer, tree, *child, level + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::Editable;

    #[test]
    fn plain() {
        let mut root = Node::new("col");
        root.owner_name = "Demo";
        let mut t = Tree::new(root);
        let r = t.root();
        let mut text = Node::new("text");
        text.content = "hi".into();
        text.owner_name = "Demo";
        t.append(r, text).unwrap();
        let mut input = Node::new("input");
        input.source_tag = "Field".into();
        input.owner_name = "Demo";
        input.displayed = false;
        input.editable = Some(Editable {
            cursor: 2,
            focused: true,
        });
        t.append(r, input).unwrap();
        assert_eq!(
            dump_plain(&t).unwrap(),
            "col [Demo]\n    text [Demo] \"hi\"\n    input <Field> [Demo] (hidden) cursor=2 focused\n"
        );
        assert!(dump(&t).unwrap().contains("\u{1b}["));
    }
}
