use arbor::{
    Component, ComponentRef, Event, derive_component, draw::Canvas, handler, subcomponent,
    style::Style,
};
use image::Rgba;
use serde::Serialize;
use serde_json::Value;

/// A small form: a name field, a notes area, a colour swatch drawn by the
/// component, and a submit button.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Form {
    /// Contents of the name field.
    pub name: String,
    /// Contents of the notes area.
    pub notes: String,
    /// Status line.
    pub status: String,
    /// Names submitted so far.
    pub submitted: Vec<String>,
}

#[derive_component]
impl Form {
    /// Construct an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    #[handler]
    fn set_name(&mut self, e: &Event) {
        self.name = e.value.clone();
    }

    #[handler]
    fn set_notes(&mut self, e: &Event) {
        self.notes = e.value.clone();
    }

    /// Record the current name.
    #[handler]
    pub fn submit(&mut self) {
        let name = self.name.trim();
        if name.is_empty() {
            self.status = "a name is required".into();
            return;
        }
        self.submitted.push(name.to_string());
        self.status = format!("submitted {}", self.submitted.len());
        self.name.clear();
    }

    /// Fill the swatch with a colour derived from the name.
    #[handler]
    fn swatch(&mut self, c: &mut Canvas) {
        let seed = self
            .name
            .bytes()
            .fold(7u32, |h, b| h.wrapping_mul(31).wrapping_add(b.into()));
        let [r, g, b, _] = seed.to_le_bytes();
        let w = c.width().max(1);
        for (x, _, px) in c.enumerate_pixels_mut() {
            let shade = (255 * x / w) as u8;
            *px = Rgba([r, g, b.saturating_add(shade / 2), 255]);
        }
    }

    #[subcomponent]
    fn label(&self) -> Style {
        Style::alias("text").with("color", "#555555")
    }
}

impl Component for Form {
    fn ui(&self) -> String {
        r#"<col padding="8" gap="6" align="start">
            <Label>name</Label>
            <input id="name" value="{{.Name}}" onChange="SetName"/>
            <Label>notes</Label>
            <textarea id="notes" value="{{.Notes}}" onChange="SetNotes"/>
            <row gap="8" align="center">
                <button id="submit" onClick="Submit">submit</button>
                <canvas width="48" height="16" onDraw="Swatch"/>
            </row>
            <text id="status" display="{{ne .Status ""}}">{{.Status}}</text>
            {{range .Submitted}}<text>{{.}}</text>{{end}}
        </col>"#
            .into()
    }

    fn fields(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// The demo form.
pub fn create_app() -> ComponentRef {
    ComponentRef::new(Form::new())
}
