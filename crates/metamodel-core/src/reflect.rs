//! The metadata table that stands in for runtime reflection.
//!
//! A [`TypeRegistry`] is built once (from `.dom` modules or programmatically)
//! and is immutable afterwards. It answers the questions the facet factories
//! would otherwise put to a class loader: which methods does a class have
//! (declared and inherited), which annotations sit on a type or a method, and
//! is one type assignable to another.
//!
//! Annotations are interpreted into a tagged variant per kind ([`Annotation`])
//! when the table is built, so factories match on typed data rather than on
//! annotation names.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use metamodel_dsl::dom_v1::{
    AnnotationV1, AnnotationValueV1, ClassDeclV1, DomV1Module, MethodDeclV1, TypeExprV1,
    VisibilityV1,
};
use serde::{Deserialize, Serialize};

use crate::config::IntrospectionPolicy;
use crate::error::{MetaModelError, Result};

/// Type names that are always known and never introspected for members.
pub const BUILTIN_VALUE_TYPES: &[&str] = &[
    "String",
    "int",
    "long",
    "short",
    "byte",
    "boolean",
    "double",
    "float",
    "char",
    "Integer",
    "Long",
    "Short",
    "Byte",
    "Boolean",
    "Double",
    "Float",
    "Character",
    "BigDecimal",
    "BigInteger",
    "LocalDate",
    "LocalDateTime",
    "LocalTime",
    "OffsetDateTime",
    "ZonedDateTime",
    "Instant",
    "UUID",
    "Blob",
    "Clob",
    "Markup",
    "Object",
];

// ============================================================================
// Annotation vocabulary
// ============================================================================

/// Fieldless discriminant of [`Annotation`], used for lookups and conflict tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationKind {
    DomainObject,
    DomainService,
    Value,
    Entity,
    DomainObjectLayout,
    Property,
    Collection,
    Action,
    Parameter,
    PropertyLayout,
    CollectionLayout,
    ActionLayout,
    ParameterLayout,
    Title,
    MemberOrder,
    Digits,
    MemberSupport,
    ObjectSupport,
    ObjectLifecycle,
    Include,
    Exclude,
    Programmatic,
    Other,
}

impl AnnotationKind {
    /// Annotations that declare a method to be a member.
    pub const MEMBER_ANNOTATIONS: &'static [AnnotationKind] = &[
        AnnotationKind::Property,
        AnnotationKind::Collection,
        AnnotationKind::Action,
    ];

    /// Annotations that declare a method to be a support method.
    pub const SUPPORT_MARKERS: &'static [AnnotationKind] = &[
        AnnotationKind::MemberSupport,
        AnnotationKind::ObjectSupport,
        AnnotationKind::ObjectLifecycle,
        AnnotationKind::Include,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Nature {
    #[default]
    NotSpecified,
    Entity,
    ViewModel,
    Mixin,
    Bean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Editing {
    #[default]
    NotSpecified,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Optionality {
    #[default]
    Default,
    Mandatory,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SemanticsOf {
    #[default]
    NotSpecified,
    Safe,
    Idempotent,
    IdempotentAreYouSure,
    NonIdempotent,
    NonIdempotentAreYouSure,
}

impl SemanticsOf {
    pub fn is_safe(self) -> bool {
        self == SemanticsOf::Safe
    }

    pub fn is_idempotent_in_nature(self) -> bool {
        matches!(
            self,
            SemanticsOf::Safe | SemanticsOf::Idempotent | SemanticsOf::IdempotentAreYouSure
        )
    }

    pub fn is_are_you_sure(self) -> bool {
        matches!(
            self,
            SemanticsOf::IdempotentAreYouSure | SemanticsOf::NonIdempotentAreYouSure
        )
    }
}

/// Where a feature is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Where {
    #[default]
    NotSpecified,
    Everywhere,
    ObjectForms,
    AllTables,
    Nowhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderDay {
    #[default]
    NotSpecified,
    AsDay,
    AsDayBefore,
}

/// Introspection override carried by `@DomainObject(introspection = ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Introspection {
    #[default]
    AsConfigured,
    AnnotationOptional,
    AnnotationRequired,
    EncapsulationEnabled,
}

impl Introspection {
    pub fn resolve(self, configured: IntrospectionPolicy) -> IntrospectionPolicy {
        match self {
            Introspection::AsConfigured => configured,
            Introspection::AnnotationOptional => IntrospectionPolicy::AnnotationOptional,
            Introspection::AnnotationRequired => IntrospectionPolicy::AnnotationRequired,
            Introspection::EncapsulationEnabled => IntrospectionPolicy::EncapsulationEnabled,
        }
    }
}

/// Attributes shared by the `*Layout` annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutAttributes {
    pub named: Option<String>,
    pub described_as: Option<String>,
    pub css_class: Option<String>,
    pub css_class_fa: Option<String>,
    pub sequence: Option<String>,
    pub hidden: Where,
    pub render_day: RenderDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    DomainObject {
        nature: Nature,
        logical_type_name: Option<String>,
        introspection: Introspection,
    },
    DomainService {
        logical_type_name: Option<String>,
    },
    Value {
        logical_type_name: Option<String>,
    },
    Entity {
        schema: Option<String>,
        table: Option<String>,
    },
    DomainObjectLayout(LayoutAttributes),
    Property {
        editing: Editing,
        optionality: Optionality,
        max_length: Option<usize>,
        hidden: Where,
    },
    Collection {
        type_of: Option<String>,
        hidden: Where,
    },
    Action {
        semantics: SemanticsOf,
        type_of: Option<String>,
        hidden: Where,
    },
    Parameter {
        optionality: Optionality,
        max_length: Option<usize>,
    },
    PropertyLayout(LayoutAttributes),
    CollectionLayout(LayoutAttributes),
    ActionLayout(LayoutAttributes),
    ParameterLayout(LayoutAttributes),
    Title {
        sequence: Option<String>,
        prepend: Option<String>,
        append: Option<String>,
    },
    MemberOrder {
        sequence: String,
    },
    Digits {
        integer: u32,
        fraction: u32,
    },
    MemberSupport,
    ObjectSupport,
    ObjectLifecycle,
    Include,
    Exclude,
    Programmatic,
    Other {
        name: String,
    },
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::DomainObject { .. } => AnnotationKind::DomainObject,
            Annotation::DomainService { .. } => AnnotationKind::DomainService,
            Annotation::Value { .. } => AnnotationKind::Value,
            Annotation::Entity { .. } => AnnotationKind::Entity,
            Annotation::DomainObjectLayout(_) => AnnotationKind::DomainObjectLayout,
            Annotation::Property { .. } => AnnotationKind::Property,
            Annotation::Collection { .. } => AnnotationKind::Collection,
            Annotation::Action { .. } => AnnotationKind::Action,
            Annotation::Parameter { .. } => AnnotationKind::Parameter,
            Annotation::PropertyLayout(_) => AnnotationKind::PropertyLayout,
            Annotation::CollectionLayout(_) => AnnotationKind::CollectionLayout,
            Annotation::ActionLayout(_) => AnnotationKind::ActionLayout,
            Annotation::ParameterLayout(_) => AnnotationKind::ParameterLayout,
            Annotation::Title { .. } => AnnotationKind::Title,
            Annotation::MemberOrder { .. } => AnnotationKind::MemberOrder,
            Annotation::Digits { .. } => AnnotationKind::Digits,
            Annotation::MemberSupport => AnnotationKind::MemberSupport,
            Annotation::ObjectSupport => AnnotationKind::ObjectSupport,
            Annotation::ObjectLifecycle => AnnotationKind::ObjectLifecycle,
            Annotation::Include => AnnotationKind::Include,
            Annotation::Exclude => AnnotationKind::Exclude,
            Annotation::Programmatic => AnnotationKind::Programmatic,
            Annotation::Other { .. } => AnnotationKind::Other,
        }
    }

    /// Layout attributes, for any of the `*Layout` annotations.
    pub fn layout(&self) -> Option<&LayoutAttributes> {
        match self {
            Annotation::DomainObjectLayout(l)
            | Annotation::PropertyLayout(l)
            | Annotation::CollectionLayout(l)
            | Annotation::ActionLayout(l)
            | Annotation::ParameterLayout(l) => Some(l),
            _ => None,
        }
    }

    /// Interpret a parsed `.dom` annotation. `target` names the annotated
    /// element for error messages.
    pub fn from_decl(decl: &AnnotationV1, target: &str) -> Result<Annotation> {
        let args = ArgReader::new(decl, target);
        let annotation = match decl.name.as_str() {
            "DomainObject" => Annotation::DomainObject {
                nature: args.enumeration(
                    "nature",
                    &[
                        ("NOT_SPECIFIED", Nature::NotSpecified),
                        ("ENTITY", Nature::Entity),
                        ("VIEW_MODEL", Nature::ViewModel),
                        ("MIXIN", Nature::Mixin),
                        ("BEAN", Nature::Bean),
                    ],
                )?,
                logical_type_name: args.text("logicalTypeName")?,
                introspection: args.enumeration(
                    "introspection",
                    &[
                        ("AS_CONFIGURED", Introspection::AsConfigured),
                        ("ANNOTATION_OPTIONAL", Introspection::AnnotationOptional),
                        ("ANNOTATION_REQUIRED", Introspection::AnnotationRequired),
                        ("ENCAPSULATION_ENABLED", Introspection::EncapsulationEnabled),
                    ],
                )?,
            },
            "DomainService" => Annotation::DomainService {
                logical_type_name: args.text("logicalTypeName")?,
            },
            "Value" => Annotation::Value {
                logical_type_name: args.text("logicalTypeName")?,
            },
            "Entity" => Annotation::Entity {
                schema: args.text("schema")?,
                table: args.text("table")?,
            },
            "DomainObjectLayout" => Annotation::DomainObjectLayout(args.layout()?),
            "Property" => Annotation::Property {
                editing: args.enumeration(
                    "editing",
                    &[
                        ("NOT_SPECIFIED", Editing::NotSpecified),
                        ("ENABLED", Editing::Enabled),
                        ("DISABLED", Editing::Disabled),
                    ],
                )?,
                optionality: args.optionality()?,
                max_length: args.count("maxLength")?,
                hidden: args.hidden()?,
            },
            "Collection" => Annotation::Collection {
                type_of: args.text("typeOf")?,
                hidden: args.hidden()?,
            },
            "Action" => Annotation::Action {
                semantics: args.enumeration(
                    "semantics",
                    &[
                        ("NOT_SPECIFIED", SemanticsOf::NotSpecified),
                        ("SAFE", SemanticsOf::Safe),
                        ("IDEMPOTENT", SemanticsOf::Idempotent),
                        ("IDEMPOTENT_ARE_YOU_SURE", SemanticsOf::IdempotentAreYouSure),
                        ("NON_IDEMPOTENT", SemanticsOf::NonIdempotent),
                        (
                            "NON_IDEMPOTENT_ARE_YOU_SURE",
                            SemanticsOf::NonIdempotentAreYouSure,
                        ),
                    ],
                )?,
                type_of: args.text("typeOf")?,
                hidden: args.hidden()?,
            },
            "Parameter" => Annotation::Parameter {
                optionality: args.optionality()?,
                max_length: args.count("maxLength")?,
            },
            "PropertyLayout" => Annotation::PropertyLayout(args.layout()?),
            "CollectionLayout" => Annotation::CollectionLayout(args.layout()?),
            "ActionLayout" => Annotation::ActionLayout(args.layout()?),
            "ParameterLayout" => Annotation::ParameterLayout(args.layout()?),
            "Title" => Annotation::Title {
                sequence: args.text("sequence")?,
                prepend: args.text("prepend")?,
                append: args.text("append")?,
            },
            "MemberOrder" => Annotation::MemberOrder {
                sequence: args
                    .text("sequence")?
                    .or(args.text("value")?)
                    .ok_or_else(|| args.invalid("`sequence` is required"))?,
            },
            "Digits" => Annotation::Digits {
                integer: args
                    .digits("integer")?
                    .ok_or_else(|| args.invalid("`integer` is required"))?,
                fraction: args
                    .digits("fraction")?
                    .ok_or_else(|| args.invalid("`fraction` is required"))?,
            },
            "MemberSupport" => Annotation::MemberSupport,
            "ObjectSupport" => Annotation::ObjectSupport,
            "ObjectLifecycle" => Annotation::ObjectLifecycle,
            "Include" | "Domain.Include" => Annotation::Include,
            "Exclude" | "Domain.Exclude" => Annotation::Exclude,
            "Programmatic" => Annotation::Programmatic,
            other => {
                tracing::warn!(
                    annotation = other,
                    target = target,
                    "unknown annotation, keeping it as opaque metadata"
                );
                return Ok(Annotation::Other {
                    name: other.to_string(),
                });
            }
        };
        args.ensure_all_consumed()?;
        Ok(annotation)
    }
}

/// Reads annotation arguments and reports arguments nobody asked for.
struct ArgReader<'a> {
    decl: &'a AnnotationV1,
    target: &'a str,
    seen: RefCell<HashSet<&'a str>>,
}

impl<'a> ArgReader<'a> {
    fn new(decl: &'a AnnotationV1, target: &'a str) -> Self {
        Self {
            decl,
            target,
            seen: RefCell::new(HashSet::new()),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> MetaModelError {
        MetaModelError::InvalidAnnotation {
            annotation: self.decl.name.clone(),
            target: self.target.to_string(),
            message: message.into(),
        }
    }

    fn get(&self, key: &'static str) -> Option<&'a AnnotationValueV1> {
        self.seen.borrow_mut().insert(key);
        self.decl.arg(key)
    }

    fn text(&self, key: &'static str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_text()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.invalid(format!("`{key}` expects text"))),
        }
    }

    fn count(&self, key: &'static str) -> Result<Option<usize>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_int()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(format!("`{key}` expects a non-negative integer"))),
        }
    }

    fn digits(&self, key: &'static str) -> Result<Option<u32>> {
        match self.count(key)? {
            None => Ok(None),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| self.invalid(format!("`{key}` is out of range"))),
        }
    }

    fn enumeration<T: Copy + Default>(
        &self,
        key: &'static str,
        table: &[(&str, T)],
    ) -> Result<T> {
        let Some(value) = self.get(key) else {
            return Ok(T::default());
        };
        let text = value
            .as_text()
            .ok_or_else(|| self.invalid(format!("`{key}` expects a constant")))?;
        table
            .iter()
            .find(|(name, _)| *name == text)
            .map(|(_, v)| *v)
            .ok_or_else(|| self.invalid(format!("`{key}` does not accept `{text}`")))
    }

    fn optionality(&self) -> Result<Optionality> {
        self.enumeration(
            "optionality",
            &[
                ("DEFAULT", Optionality::Default),
                ("MANDATORY", Optionality::Mandatory),
                ("OPTIONAL", Optionality::Optional),
            ],
        )
    }

    fn hidden(&self) -> Result<Where> {
        self.enumeration(
            "hidden",
            &[
                ("NOT_SPECIFIED", Where::NotSpecified),
                ("EVERYWHERE", Where::Everywhere),
                ("OBJECT_FORMS", Where::ObjectForms),
                ("ALL_TABLES", Where::AllTables),
                ("NOWHERE", Where::Nowhere),
            ],
        )
    }

    fn layout(&self) -> Result<LayoutAttributes> {
        Ok(LayoutAttributes {
            named: self.text("named")?,
            described_as: self.text("describedAs")?,
            css_class: self.text("cssClass")?,
            css_class_fa: self.text("cssClassFa")?,
            sequence: self.text("sequence")?,
            hidden: self.hidden()?,
            render_day: self.enumeration(
                "renderDay",
                &[
                    ("NOT_SPECIFIED", RenderDay::NotSpecified),
                    ("AS_DAY", RenderDay::AsDay),
                    ("AS_DAY_BEFORE", RenderDay::AsDayBefore),
                ],
            )?,
        })
    }

    fn ensure_all_consumed(&self) -> Result<()> {
        let seen = self.seen.borrow();
        match self.decl.args.iter().find(|(k, _)| !seen.contains(k.as_str())) {
            Some((key, _)) => Err(self.invalid(format!("unknown argument `{key}`"))),
            None => Ok(()),
        }
    }
}

fn annotations_from_decls(decls: &[AnnotationV1], target: &str) -> Result<Vec<Annotation>> {
    decls
        .iter()
        .map(|decl| Annotation::from_decl(decl, target))
        .collect()
}

fn find_annotation(annotations: &[Annotation], kind: AnnotationKind) -> Option<&Annotation> {
    annotations.iter().find(|a| a.kind() == kind)
}

// ============================================================================
// Types and methods
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Void,
    Scalar(String),
    Collection(String),
}

impl TypeRef {
    pub fn scalar(name: impl Into<String>) -> Self {
        TypeRef::Scalar(name.into())
    }

    pub fn collection_of(element: impl Into<String>) -> Self {
        TypeRef::Collection(element.into())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeRef::Collection(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeRef::Scalar(n) if n == "boolean" || n == "Boolean")
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::Scalar(n) if n == "String")
    }

    /// The scalar type, or the element type of a collection.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            TypeRef::Void => None,
            TypeRef::Scalar(n) | TypeRef::Collection(n) => Some(n),
        }
    }

    fn from_expr(expr: Option<&TypeExprV1>) -> Self {
        match expr {
            None => TypeRef::Void,
            Some(TypeExprV1::Scalar { name }) => TypeRef::Scalar(name.clone()),
            Some(TypeExprV1::Collection { element, .. }) => TypeRef::Collection(element.clone()),
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Scalar(n) => write!(f, "{n}"),
            TypeRef::Collection(n) => write!(f, "Collection<{n}>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMeta {
    pub name: String,
    pub ty: TypeRef,
    pub annotations: Vec<Annotation>,
}

impl ParamMeta {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        find_annotation(&self.annotations, kind)
    }
}

/// Identifies a method within a class hierarchy: overriding methods share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub name: String,
    pub params: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMeta {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<ParamMeta>,
    pub return_type: TypeRef,
    pub annotations: Vec<Annotation>,
    /// Set when the method is added to a [`ClassMeta`].
    pub declaring_type: String,
}

impl MethodMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            params: Vec::new(),
            return_type: TypeRef::Void,
            annotations: Vec::new(),
            declaring_type: String::new(),
        }
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(ParamMeta::new(name, ty));
        self
    }

    pub fn with_param(mut self, param: ParamMeta) -> Self {
        self.params.push(param);
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn param_types(&self) -> Vec<TypeRef> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn key(&self) -> MethodKey {
        MethodKey {
            name: self.name.clone(),
            params: self.param_types(),
        }
    }

    pub fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        find_annotation(&self.annotations, kind)
    }

    pub fn has_annotation(&self, kind: AnnotationKind) -> bool {
        self.annotation(kind).is_some()
    }

    pub fn has_any_annotation(&self, kinds: &[AnnotationKind]) -> bool {
        kinds.iter().any(|k| self.has_annotation(*k))
    }

    /// `Type#name(ParamType, ...)`, for diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.ty.to_string()).collect();
        format!("{}#{}({})", self.declaring_type, self.name, params.join(", "))
    }

    fn from_decl(decl: &MethodDeclV1, declaring_type: &str) -> Result<Self> {
        let target = format!("{declaring_type}#{}", decl.name);
        let params = decl
            .params
            .iter()
            .map(|p| {
                Ok(ParamMeta {
                    name: p.name.clone(),
                    ty: TypeRef::from_expr(Some(&p.ty)),
                    annotations: annotations_from_decls(
                        &p.annotations,
                        &format!("{target}({})", p.name),
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: decl.name.clone(),
            visibility: match decl.visibility {
                VisibilityV1::Public => Visibility::Public,
                VisibilityV1::Protected => Visibility::Protected,
                VisibilityV1::Private => Visibility::Private,
            },
            is_static: decl.is_static,
            is_abstract: decl.is_abstract,
            params,
            return_type: TypeRef::from_expr(decl.return_type.as_ref()),
            annotations: annotations_from_decls(&decl.annotations, &target)?,
            declaring_type: declaring_type.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMeta {
    pub name: String,
    pub superclass: Option<String>,
    pub is_abstract: bool,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<Arc<MethodMeta>>,
}

impl ClassMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            is_abstract: false,
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(mut self, mut method: MethodMeta) -> Self {
        method.declaring_type = self.name.clone();
        self.methods.push(Arc::new(method));
        self
    }

    pub fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        find_annotation(&self.annotations, kind)
    }

    /// The simple name: `crm.Customer` → `Customer`.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    fn from_decl(decl: &ClassDeclV1) -> Result<Self> {
        let methods = decl
            .methods
            .iter()
            .map(|m| MethodMeta::from_decl(m, &decl.name).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: decl.name.clone(),
            superclass: decl.superclass.clone(),
            is_abstract: decl.is_abstract,
            annotations: annotations_from_decls(&decl.annotations, &decl.name)?,
            methods,
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Immutable table of domain classes (the class-loader equivalent).
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: BTreeMap<String, Arc<ClassMeta>>,
    value_types: BTreeSet<String>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    pub fn from_module(module: &DomV1Module) -> Result<Self> {
        Self::builder().module(module)?.build()
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ClassMeta>> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassMeta>> {
        self.classes.values()
    }

    pub fn is_value_type(&self, name: &str) -> bool {
        self.value_types.contains(name)
    }

    /// Registered class or value type.
    pub fn is_known_type(&self, name: &str) -> bool {
        self.contains(name) || self.is_value_type(name)
    }

    /// Superclasses of `name`, nearest first (excluding `name` itself).
    pub fn superclass_chain(&self, name: &str) -> Vec<&Arc<ClassMeta>> {
        let mut chain = Vec::new();
        let mut next = self.class(name).and_then(|c| c.superclass.as_deref());
        while let Some(sup) = next {
            let Some(class) = self.class(sup) else { break };
            chain.push(class);
            next = class.superclass.as_deref();
        }
        chain
    }

    /// Whether a value of type `sub` can be used where `sup` is expected.
    pub fn is_assignable_from(&self, sup: &str, sub: &str) -> bool {
        sup == sub
            || sup == "Object"
            || self.superclass_chain(sub).iter().any(|c| c.name == sup)
    }

    /// Declared methods followed by inherited ones that aren't overridden.
    pub fn methods_of(&self, name: &str) -> Vec<Arc<MethodMeta>> {
        let Some(class) = self.class(name) else {
            return Vec::new();
        };
        let mut seen: HashSet<MethodKey> = HashSet::new();
        let mut out = Vec::new();
        for c in std::iter::once(class).chain(self.superclass_chain(name)) {
            for method in &c.methods {
                if seen.insert(method.key()) {
                    out.push(method.clone());
                }
            }
        }
        out
    }

    /// A class annotation of the given kind, inherited along the superclass chain.
    pub fn synthesize_on_type(&self, name: &str, kind: AnnotationKind) -> Option<&Annotation> {
        let class = self.class(name)?;
        std::iter::once(class)
            .chain(self.superclass_chain(name))
            .find_map(|c| c.annotation(kind))
    }

    /// A method annotation of the given kind, on the method itself or on a
    /// concrete method it overrides.
    ///
    /// Known limitation: abstract declarations in superclasses are skipped, so
    /// an annotation placed only on an abstract superclass method is not seen
    /// through the override.
    pub fn synthesize_on_method<'m>(
        &'m self,
        method: &'m MethodMeta,
        kind: AnnotationKind,
    ) -> Option<&'m Annotation> {
        if let Some(found) = method.annotation(kind) {
            return Some(found);
        }
        let key = method.key();
        self.superclass_chain(&method.declaring_type)
            .into_iter()
            .flat_map(|c| c.methods.iter())
            .filter(|m| !m.is_abstract && m.key() == key)
            .find_map(|m| m.annotation(kind))
    }

    pub fn method_has_annotation(&self, method: &MethodMeta, kind: AnnotationKind) -> bool {
        self.synthesize_on_method(method, kind).is_some()
    }

    pub fn method_has_any_annotation(&self, method: &MethodMeta, kinds: &[AnnotationKind]) -> bool {
        kinds.iter().any(|k| self.method_has_annotation(method, *k))
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    classes: Vec<ClassMeta>,
    value_types: Vec<String>,
}

impl TypeRegistryBuilder {
    pub fn class(mut self, class: ClassMeta) -> Self {
        self.classes.push(class);
        self
    }

    pub fn module(mut self, module: &DomV1Module) -> Result<Self> {
        for decl in &module.classes {
            self.classes.push(ClassMeta::from_decl(decl)?);
        }
        Ok(self)
    }

    pub fn value_type(mut self, name: impl Into<String>) -> Self {
        self.value_types.push(name.into());
        self
    }

    pub fn value_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_types.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<TypeRegistry> {
        let mut classes: BTreeMap<String, Arc<ClassMeta>> = BTreeMap::new();
        for class in self.classes {
            if classes.contains_key(&class.name) {
                return Err(MetaModelError::illegal_argument(format!(
                    "duplicate class `{}`",
                    class.name
                )));
            }
            classes.insert(class.name.clone(), Arc::new(class));
        }

        let mut value_types: BTreeSet<String> =
            BUILTIN_VALUE_TYPES.iter().map(|s| s.to_string()).collect();
        value_types.extend(self.value_types);

        for class in classes.values() {
            if value_types.contains(&class.name) {
                return Err(MetaModelError::illegal_argument(format!(
                    "class `{}` shadows a built-in value type",
                    class.name
                )));
            }
            if let Some(sup) = &class.superclass {
                if !classes.contains_key(sup) {
                    return Err(MetaModelError::UnknownType(sup.clone()));
                }
            }
            // Superclass cycles would make every chain walk loop.
            let mut visited: HashSet<&str> = HashSet::from([class.name.as_str()]);
            let mut next = class.superclass.as_deref();
            while let Some(sup) = next {
                if !visited.insert(sup) {
                    return Err(MetaModelError::illegal_argument(format!(
                        "superclass cycle through `{}`",
                        class.name
                    )));
                }
                next = classes.get(sup).and_then(|c| c.superclass.as_deref());
            }
        }

        Ok(TypeRegistry {
            classes,
            value_types,
        })
    }
}
