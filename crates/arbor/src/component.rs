//! The capability contract between components and the engine.
//!
//! Components expose behavior to markup by name. Handler and subcomponent
//! methods are registered in static tables, normally generated by
//! `#[derive_component]`, so a name in markup resolves to a typed function
//! without any runtime reflection.

use std::{
    any::{Any, TypeId, type_name},
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
    result::Result as StdResult,
};

use serde_json::Value;
use thiserror::Error;

use crate::{
    draw::Canvas,
    error::{DispatchError, Error, Result},
    event::Event,
    style::Style,
};

/// Failures inside a handler or subcomponent capability.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The registered function was called with the wrong component type.
    #[error("handler target type mismatch")]
    TargetMismatch,
    /// The handler was called with an argument it does not accept.
    #[error("handler expects {expected}, got {got}")]
    Argument {
        /// The argument the handler takes.
        expected: &'static str,
        /// The argument that was supplied.
        got: &'static str,
    },
    /// The handler body returned an error.
    #[error(transparent)]
    Exec(anyhow::Error),
}

/// The argument a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerParam {
    /// No argument.
    None,
    /// An `&Event`.
    Event,
    /// A `&mut Canvas`, for `onDraw`.
    Canvas,
}

/// The value a handler is invoked with.
pub enum HandlerArg<'a> {
    /// A synthesized event record.
    Event(&'a Event<'a>),
    /// A scratch canvas to draw into.
    Canvas(&'a mut Canvas),
}

impl<'a> HandlerArg<'a> {
    /// A short description for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Canvas(_) => "canvas",
        }
    }

    /// Unwrap an event argument.
    pub fn event(self) -> HandlerResult<&'a Event<'a>> {
        match self {
            Self::Event(e) => Ok(e),
            other => Err(HandlerError::Argument {
                expected: "event",
                got: other.kind(),
            }),
        }
    }

    /// Unwrap a canvas argument.
    pub fn canvas(self) -> HandlerResult<&'a mut Canvas> {
        match self {
            Self::Canvas(c) => Ok(c),
            other => Err(HandlerError::Argument {
                expected: "canvas",
                got: other.kind(),
            }),
        }
    }
}

/// Result type for registered capability functions.
pub type HandlerResult<T> = StdResult<T, HandlerError>;

/// Erased handler entrypoint.
pub type InvokeFn = fn(&mut dyn Any, HandlerArg<'_>) -> HandlerResult<()>;

/// Erased subcomponent entrypoint.
pub type ResolveFn = fn(&dyn Any) -> HandlerResult<Option<Subcomponent>>;

/// Static metadata for a handler method.
#[derive(Clone, Copy, Debug)]
pub struct HandlerSpec {
    /// Name referenced from markup attributes.
    pub name: &'static str,
    /// The argument the handler takes.
    pub param: HandlerParam,
    /// Erased invoke entrypoint.
    pub invoke: InvokeFn,
}

/// Static metadata for a subcomponent capability.
#[derive(Clone, Copy, Debug)]
pub struct SubcomponentSpec {
    /// Tag name referenced from markup.
    pub name: &'static str,
    /// Erased resolve entrypoint.
    pub resolve: ResolveFn,
}

/// Registered capability tables.
pub trait Dispatch {
    /// Handlers that markup can reference from `on*` attributes.
    fn handlers(&self) -> &'static [&'static HandlerSpec] {
        &[]
    }

    /// Capabilities that markup can reference as uppercase tags.
    fn subcomponents(&self) -> &'static [&'static SubcomponentSpec] {
        &[]
    }
}

/// A value that renders markup.
pub trait Component: Dispatch + Any {
    /// The markup template.
    fn ui(&self) -> String;

    /// The fields the template is rendered against.
    fn fields(&self) -> serde_json::Result<Value> {
        Ok(Value::Null)
    }

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        let name = type_name::<Self>();
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }
}

/// Look up a handler by name.
pub fn find_handler(c: &dyn Component, name: &str) -> Option<&'static HandlerSpec> {
    c.handlers().iter().copied().find(|h| h.name == name)
}

/// Look up a subcomponent capability by tag.
pub fn find_subcomponent(c: &dyn Component, tag: &str) -> Option<&'static SubcomponentSpec> {
    c.subcomponents().iter().copied().find(|s| s.name == tag)
}

/// A shared handle to a component.
#[derive(Clone)]
pub struct ComponentRef(Rc<RefCell<dyn Component>>);

impl ComponentRef {
    /// Wrap a component.
    pub fn new<T: Component>(c: T) -> Self {
        Self(Rc::new(RefCell::new(c)))
    }

    /// Borrow the component.
    pub fn borrow(&self) -> Ref<'_, dyn Component> {
        self.0.borrow()
    }

    /// Mutably borrow the component.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Component> {
        self.0.borrow_mut()
    }

    /// The concrete type of the component.
    pub fn type_id(&self) -> TypeId {
        let c = self.0.borrow();
        let any: &dyn Any = &*c;
        any.type_id()
    }

    /// The component's diagnostic name.
    pub fn name(&self) -> &'static str {
        self.0.borrow().name()
    }

    /// A weak handle to the same component.
    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Some(Rc::downgrade(&self.0)))
    }

    /// Do both handles point at the same component?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Invoke the handler registered under `name`, referenced from the
    /// attribute `attr`.
    pub fn invoke(&self, attr: &str, name: &str, arg: HandlerArg<'_>) -> Result<()> {
        let mut c = self.0.borrow_mut();
        let component = c.name();
        let spec = find_handler(&*c, name).ok_or_else(|| DispatchError::MissingHandler {
            component: component.to_string(),
            attr: attr.to_string(),
            handler: name.to_string(),
        })?;
        let target: &mut dyn Any = &mut *c;
        (spec.invoke)(target, arg).map_err(|source| Error::Handler {
            component: component.to_string(),
            handler: name.to_string(),
            source,
        })
    }

    /// Resolve the subcomponent capability registered under `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Option<Subcomponent>> {
        let c = self.0.borrow();
        let component = c.name();
        let spec = find_subcomponent(&*c, tag).ok_or_else(|| DispatchError::MissingCapability {
            component: component.to_string(),
            tag: tag.to_string(),
        })?;
        let target: &dyn Any = &*c;
        (spec.resolve)(target).map_err(|source| Error::Handler {
            component: component.to_string(),
            handler: tag.to_string(),
            source,
        })
    }
}

impl<T: Component> From<Rc<RefCell<T>>> for ComponentRef {
    fn from(c: Rc<RefCell<T>>) -> Self {
        Self(c)
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(c) => write!(f, "ComponentRef({})", c.name()),
            Err(_) => write!(f, "ComponentRef(<borrowed>)"),
        }
    }
}

/// A non-owning handle to a component, held by nodes.
#[derive(Clone, Default)]
pub struct WeakComponent(Option<Weak<RefCell<dyn Component>>>);

impl WeakComponent {
    /// Upgrade to a strong handle, if the component is still alive.
    pub fn upgrade(&self) -> Option<ComponentRef> {
        self.0.as_ref().and_then(Weak::upgrade).map(ComponentRef)
    }
}

impl fmt::Debug for WeakComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(c) => write!(f, "WeakComponent({})", c.name()),
            None => write!(f, "WeakComponent(<dropped>)"),
        }
    }
}

/// What a subcomponent capability resolves to.
pub enum Subcomponent {
    /// A named style preset over a primitive tag.
    Style(Style),
    /// A nested component, expanded in place.
    Component(ComponentRef),
}

impl fmt::Debug for Subcomponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style(s) => f.debug_tuple("Style").field(&s.extends).finish(),
            Self::Component(c) => f.debug_tuple("Component").field(c).finish(),
        }
    }
}

/// Values a subcomponent method may return.
pub trait IntoSubcomponent {
    /// Convert into a subcomponent. `None` means the capability produced
    /// neither a style nor a component.
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>>;
}

impl IntoSubcomponent for Subcomponent {
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>> {
        Ok(Some(self))
    }
}

impl IntoSubcomponent for Style {
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>> {
        Ok(Some(Subcomponent::Style(self)))
    }
}

impl IntoSubcomponent for ComponentRef {
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>> {
        Ok(Some(Subcomponent::Component(self)))
    }
}

impl<T: Component> IntoSubcomponent for Rc<RefCell<T>> {
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>> {
        Ok(Some(Subcomponent::Component(self.into())))
    }
}

impl<T: IntoSubcomponent> IntoSubcomponent for Option<T> {
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>> {
        match self {
            Some(v) => v.into_subcomponent(),
            None => Ok(None),
        }
    }
}

impl<T, E> IntoSubcomponent for StdResult<T, E>
where
    T: IntoSubcomponent,
    E: Into<anyhow::Error>,
{
    fn into_subcomponent(self) -> HandlerResult<Option<Subcomponent>> {
        match self {
            Ok(v) => v.into_subcomponent(),
            Err(e) => Err(HandlerError::Exec(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl Dispatch for Plain {}

    impl Component for Plain {
        fn ui(&self) -> String {
            "<row/>".into()
        }
    }

    #[derive(Default)]
    struct Counter {
        n: usize,
    }

    impl Counter {
        fn invoke_bump(target: &mut dyn Any, arg: HandlerArg<'_>) -> HandlerResult<()> {
            let target = target
                .downcast_mut::<Self>()
                .ok_or(HandlerError::TargetMismatch)?;
            arg.event()?;
            target.n += 1;
            Ok(())
        }

        fn resolve_child(target: &dyn Any) -> HandlerResult<Option<Subcomponent>> {
            target
                .downcast_ref::<Self>()
                .ok_or(HandlerError::TargetMismatch)?;
            Some(ComponentRef::new(Plain)).into_subcomponent()
        }

        const BUMP: HandlerSpec = HandlerSpec {
            name: "Bump",
            param: HandlerParam::Event,
            invoke: Self::invoke_bump,
        };

        const CHILD: SubcomponentSpec = SubcomponentSpec {
            name: "Child",
            resolve: Self::resolve_child,
        };
    }

    impl Dispatch for Counter {
        fn handlers(&self) -> &'static [&'static HandlerSpec] {
            &[&Self::BUMP]
        }

        fn subcomponents(&self) -> &'static [&'static SubcomponentSpec] {
            &[&Self::CHILD]
        }
    }

    impl Component for Counter {
        fn ui(&self) -> String {
            "<Child/>".into()
        }
    }

    #[test]
    fn names() {
        assert_eq!(Plain.name(), "Plain");
        assert_eq!(ComponentRef::new(Counter::default()).name(), "Counter");
    }

    #[test]
    fn lookup() {
        let c = ComponentRef::new(Counter::default());
        assert!(matches!(
            c.resolve("Child").unwrap(),
            Some(Subcomponent::Component(_))
        ));
        assert!(matches!(
            c.resolve("Nope"),
            Err(Error::Dispatch(DispatchError::MissingCapability { .. }))
        ));
        assert!(matches!(
            c.invoke("onClick", "Nope", HandlerArg::Canvas(&mut Canvas::new(1, 1))),
            Err(Error::Dispatch(DispatchError::MissingHandler { .. }))
        ));
        assert!(matches!(
            c.invoke("onClick", "Bump", HandlerArg::Canvas(&mut Canvas::new(1, 1))),
            Err(Error::Handler {
                source: HandlerError::Argument { .. },
                ..
            })
        ));
    }

    #[test]
    fn weak_handles() {
        let c = ComponentRef::new(Plain);
        let w = c.downgrade();
        assert!(w.upgrade().is_some_and(|u| u.ptr_eq(&c)));
        drop(c);
        assert!(w.upgrade().is_none());
        assert!(WeakComponent::default().upgrade().is_none());
    }

    #[test]
    fn shared_component() {
        let shared = Rc::new(RefCell::new(Counter::default()));
        let c: ComponentRef = shared.clone().into();
        assert_eq!(c.type_id(), TypeId::of::<Counter>());
        assert!(matches!(
            shared.into_subcomponent(),
            Ok(Some(Subcomponent::Component(_)))
        ));
        let none: Option<Style> = None;
        assert!(matches!(none.into_subcomponent(), Ok(None)));
        let failed: StdResult<Style, anyhow::Error> = Err(anyhow::anyhow!("boom"));
        assert!(matches!(
            failed.into_subcomponent(),
            Err(HandlerError::Exec(_))
        ));
    }
}
