//! Runtime type descriptors for declared operation types.
//!
//! Factories are queried with a [`TypeDescriptor`] instead of a static type,
//! so one ordered list of factories can serve every operation. Generic types
//! attach *type data* to their descriptor: typed witnesses, monomorphized at
//! the declaration site, that let an erased factory build an adapter or
//! converter for that exact type.

use bytes::Bytes;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::body::ResponseBody;
use crate::response::Response;
use crate::types::RawResponse;

/// Shape of a described type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A concrete, fully resolved type
    Concrete,
    /// The unit type `()`
    Unit,
    /// An unresolved type variable or wildcard
    Variable,
}

type TypeData = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Runtime description of a declared type.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    id: Option<TypeId>,
    kind: TypeKind,
    args: Vec<TypeDescriptor>,
    data: Arc<TypeData>,
}

impl TypeDescriptor {
    /// Describe a static type
    pub fn of<T: ?Sized + 'static>() -> Self {
        let id = TypeId::of::<T>();
        let kind = if id == TypeId::of::<()>() {
            TypeKind::Unit
        } else {
            TypeKind::Concrete
        };
        Self {
            name: Cow::Borrowed(std::any::type_name::<T>()),
            id: Some(id),
            kind,
            args: Vec::new(),
            data: Arc::default(),
        }
    }

    /// Describe an unresolved type variable such as `T` or `?`
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            id: None,
            kind: TypeKind::Variable,
            args: Vec::new(),
            data: Arc::default(),
        }
    }

    /// Append a type argument
    pub fn with_arg(mut self, arg: TypeDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    /// Attach type data, replacing any earlier value of the same type
    pub fn with_data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        Arc::make_mut(&mut self.data).insert(TypeId::of::<D>(), Arc::new(data));
        self
    }

    /// Look up attached type data
    pub fn data<D: Any>(&self) -> Option<&D> {
        self.data
            .get(&TypeId::of::<D>())
            .and_then(|d| d.as_ref().downcast_ref::<D>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.id
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    /// Type argument at `index`
    pub fn arg(&self, index: usize) -> Option<&TypeDescriptor> {
        self.args.get(index)
    }

    /// Whether this describes the static type `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == Some(TypeId::of::<T>())
    }

    pub fn is_unit(&self) -> bool {
        self.kind == TypeKind::Unit
    }

    /// Whether this type or any of its arguments is unresolved
    pub fn has_unresolvable(&self) -> bool {
        self.kind == TypeKind::Variable || self.args.iter().any(Self::has_unresolvable)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        // Static names already spell out their arguments.
        if self.id.is_none() && !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("data", &self.data.len())
            .finish()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name && self.args == other.args,
            _ => false,
        }
    }
}

/// Types that can appear in an operation signature.
pub trait Reflect: 'static {
    /// Describe this type
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
    }
}

/// Type data marking [`Response`] descriptors, whatever their body type.
#[derive(Debug, Clone, Copy)]
pub struct ResponseEnvelope;

/// Implements [`Reflect`] with the plain descriptor for each listed type.
#[macro_export]
macro_rules! impl_reflect {
    ($($ty:ty),* $(,)?) => {
        $(impl $crate::reflect::Reflect for $ty {})*
    };
}

impl_reflect!(
    (),
    bool,
    i32,
    i64,
    u32,
    u64,
    f32,
    f64,
    String,
    Bytes,
    ResponseBody,
    RawResponse,
);

impl<T: Reflect> Reflect for Response<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
            .with_arg(T::descriptor())
            .with_data(ResponseEnvelope)
    }
}
