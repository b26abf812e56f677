use thiserror::Error;

use crate::metadata::introspection::ElementKind;

macro_rules! invalid_argument {
    // Single string version
    ($param:expr, $msg:expr) => {
        crate::Error::InvalidArgument {
            parameter: $param,
            message: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($param:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::InvalidArgument {
            parameter: $param,
            message: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every error in this crate is a configuration-time error: it is raised synchronously by the
/// call that staged an attribute (or built a type in the reference model) and the failing call
/// leaves the receiver unchanged. Query paths on an [`crate::annotations::AnnotationTable`] or a
/// projection never produce errors of their own.
///
/// # Error Categories
///
/// ## Argument Errors
/// - [`Error::InvalidArgument`] - A required input was empty or out of its domain
///
/// ## Lookup Errors
/// - [`Error::MemberNotFound`] - No declared member with the requested name exists
/// - [`Error::AmbiguousMember`] - More than one declared member matches the request
/// - [`Error::ParameterNotFound`] - A parameter does not belong to a resolvable method
///
/// ## Selector Errors
/// - [`Error::Resolution`] - A member selector did not reduce to exactly one member
///
/// ## Type System Errors
/// - [`Error::TypeError`] - The reference type model rejected a construction request
///
/// # Examples
///
/// ```rust
/// use attrscope::{Error, annotations::AnnotationTableBuilder};
/// use attrscope::metadata::typesystem::{TypeBuilder, TypeRegistry};
///
/// let registry = TypeRegistry::new("Sample");
/// let widget = TypeBuilder::class("Sample", "Widget").build(&registry)?;
///
/// let mut builder = AnnotationTableBuilder::new();
/// match builder.add_property_attributes(widget.as_ref(), "Missing", Vec::new()) {
///     Err(Error::MemberNotFound { type_name, member, .. }) => {
///         println!("{type_name} has no property {member}");
///     }
///     Err(e) => println!("Other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// # Ok::<(), attrscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was empty or otherwise invalid.
    ///
    /// Raised immediately at the builder call site, never deferred to query time.
    ///
    /// # Fields
    ///
    /// * `parameter` - Name of the offending parameter
    /// * `message` - Why the value was rejected
    #[error("Invalid argument '{parameter}': {message}")]
    InvalidArgument {
        /// The name of the parameter that was rejected
        parameter: &'static str,
        /// Description of the problem
        message: String,
    },

    /// No member with the given name is declared (declared-only lookup) on the type.
    #[error("Type '{type_name}' declares no {kind} named '{member}'")]
    MemberNotFound {
        /// Full name of the type that was searched
        type_name: String,
        /// The member name that was requested
        member: String,
        /// The kind of member that was requested
        kind: ElementKind,
    },

    /// The requested member name matches more than one declared member.
    #[error("Type '{type_name}' declares {count} {kind} members matching '{member}'")]
    AmbiguousMember {
        /// Full name of the type that was searched
        type_name: String,
        /// The member name that was requested
        member: String,
        /// The kind of member that was requested
        kind: ElementKind,
        /// How many declared members matched
        count: usize,
    },

    /// A parameter could not be mapped to a declared method and position.
    #[error("Method '{method}' has no parameter at position {position}")]
    ParameterNotFound {
        /// Display name of the owning method
        method: String,
        /// The requested zero-based position (-1 is the return value)
        position: i32,
    },

    /// A member selector did not reduce to a single member reference.
    #[error("Selector '{selector}' could not be resolved: {message}")]
    Resolution {
        /// The selector text as given by the caller
        selector: String,
        /// Why resolution failed
        message: String,
    },

    /// General error during construction of the reference type model.
    #[error("{0}")]
    TypeError(String),
}
