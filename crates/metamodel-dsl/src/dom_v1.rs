//! `.dom` dialect: `dom_v1`
//!
//! A line-oriented declaration language for domain classes:
//!
//! ```text
//! module Crm
//!
//! @DomainObject(nature = ENTITY)
//! @Entity(schema = "crm", table = "Customer")
//! class crm.Customer extends crm.Party:
//!   @Property(maxLength = 40)
//!   public getName() -> String
//!   public getOrders() -> List<crm.Order>
//!   public placeOrder(product: crm.Product, quantity: int) -> crm.Order
//!   private hidePlaceOrder() -> boolean @MemberSupport
//! ```
//!
//! Notes:
//! - `@` lines attach to the next class header or method line. Annotations may
//!   also trail a header or method on the same line.
//! - Methods default to `public`; a missing `-> Type` means `void`.
//! - `List<T>`, `Set<T>`, `Collection<T>` and `SortedSet<T>` declare
//!   collection-valued return or parameter types.
//! - `#` starts a comment.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while, take_while1},
    character::complete::{char as pchar, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Name = String;

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomV1Module {
    pub module_name: Name,
    pub classes: Vec<ClassDeclV1>,
}

impl DomV1Module {
    pub fn class(&self, name: &str) -> Option<&ClassDeclV1> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassDeclV1 {
    /// Fully-qualified type name (`crm.Customer`).
    pub name: Name,
    pub superclass: Option<Name>,
    pub is_abstract: bool,
    pub annotations: Vec<AnnotationV1>,
    pub methods: Vec<MethodDeclV1>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityV1 {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodDeclV1 {
    pub name: Name,
    pub visibility: VisibilityV1,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<ParamDeclV1>,
    /// `None` for `void`.
    pub return_type: Option<TypeExprV1>,
    pub annotations: Vec<AnnotationV1>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamDeclV1 {
    pub name: Name,
    pub ty: TypeExprV1,
    pub annotations: Vec<AnnotationV1>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TypeExprV1 {
    Scalar { name: Name },
    Collection { container: Name, element: Name },
}

impl TypeExprV1 {
    pub fn scalar(name: impl Into<Name>) -> Self {
        TypeExprV1::Scalar { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationV1 {
    pub name: Name,
    pub args: Vec<(Name, AnnotationValueV1)>,
}

impl AnnotationV1 {
    pub fn marker(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&self, key: &str) -> Option<&AnnotationValueV1> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "tag", content = "value", rename_all = "snake_case")]
pub enum AnnotationValueV1 {
    Str(String),
    Ident(Name),
    Int(i64),
    Bool(bool),
}

impl AnnotationValueV1 {
    /// Text of a string or identifier value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnnotationValueV1::Str(s) | AnnotationValueV1::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AnnotationValueV1::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValueV1::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Error)]
pub enum DomV1ParseError {
    #[error("parse error on line {line}: {message}")]
    Line { line: usize, message: String },
}

const COLLECTION_CONTAINERS: &[&str] = &["List", "Set", "SortedSet", "Collection"];

pub fn parse_dom_v1(text: &str) -> Result<DomV1Module, DomV1ParseError> {
    let mut module = DomV1Module {
        module_name: "Unnamed".to_string(),
        classes: vec![],
    };

    let mut current_class: Option<usize> = None;
    let mut pending: Vec<AnnotationV1> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let err = |message: String| DomV1ParseError::Line {
            line: line_no,
            message,
        };

        if let Some(name) = line
            .strip_prefix("module ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            if !pending.is_empty() {
                return Err(err("annotations must precede a class or method".to_string()));
            }
            module.module_name = name.to_string();
            continue;
        }

        if line.starts_with('@') {
            let annotations = parse_annotation_line(line).map_err(err)?;
            pending.extend(annotations);
            continue;
        }

        if line.starts_with("class ") || line.starts_with("abstract class ") {
            let mut class = parse_class_header(line).map_err(err)?;
            let mut annotations = std::mem::take(&mut pending);
            annotations.append(&mut class.annotations);
            class.annotations = annotations;
            if module.classes.iter().any(|c| c.name == class.name) {
                return Err(err(format!("duplicate class `{}`", class.name)));
            }
            module.classes.push(class);
            current_class = Some(module.classes.len() - 1);
            continue;
        }

        let Some(class_index) = current_class else {
            return Err(err(format!("unrecognized top-level line: {line}")));
        };

        let mut method = parse_method_decl(line).map_err(err)?;
        let mut annotations = std::mem::take(&mut pending);
        annotations.append(&mut method.annotations);
        method.annotations = annotations;
        module.classes[class_index].methods.push(method);
    }

    if !pending.is_empty() {
        return Err(DomV1ParseError::Line {
            line: text.lines().count(),
            message: "dangling annotations at end of input".to_string(),
        });
    }

    Ok(module)
}

fn strip_comment(line: &str) -> &str {
    // `#` inside a string literal is kept.
    let mut in_string = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..idx],
            _ => {}
        }
    }
    line
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    )))(input)
}

fn parse_qualified_ident(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(pchar('.'), parse_ident))(input)
}

fn parse_type_expr(input: &str) -> IResult<&str, TypeExprV1> {
    let (input, head) = parse_qualified_ident(input)?;
    let (input, element) = opt(delimited(
        preceded(multispace0, pchar('<')),
        preceded(multispace0, parse_qualified_ident),
        preceded(multispace0, pchar('>')),
    ))(input)?;
    let ty = match element {
        Some(element) if COLLECTION_CONTAINERS.contains(&head) => TypeExprV1::Collection {
            container: head.to_string(),
            element: element.to_string(),
        },
        // Non-collection generics (`Optional<T>`) collapse to their argument.
        Some(element) => TypeExprV1::scalar(element),
        None => TypeExprV1::scalar(head),
    };
    Ok((input, ty))
}

fn parse_string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(pchar('"'), opt(is_not("\"")), pchar('"')),
        |s: Option<&str>| s.unwrap_or_default().to_string(),
    )(input)
}

fn parse_annotation_value(input: &str) -> IResult<&str, AnnotationValueV1> {
    alt((
        map(parse_string_literal, AnnotationValueV1::Str),
        map(recognize(pair(opt(pchar('-')), digit1)), |s: &str| {
            AnnotationValueV1::Int(s.parse().unwrap_or_default())
        }),
        map(parse_qualified_ident, |s: &str| match s {
            "true" => AnnotationValueV1::Bool(true),
            "false" => AnnotationValueV1::Bool(false),
            other => AnnotationValueV1::Ident(other.to_string()),
        }),
    ))(input)
}

fn parse_annotation_arg(input: &str) -> IResult<&str, (Name, AnnotationValueV1)> {
    let named = map(
        tuple((
            preceded(multispace0, parse_ident),
            preceded(multispace0, pchar('=')),
            preceded(multispace0, parse_annotation_value),
        )),
        |(key, _, value)| (key.to_string(), value),
    );
    let positional = map(preceded(multispace0, parse_annotation_value), |value| {
        ("value".to_string(), value)
    });
    alt((named, positional))(input)
}

fn parse_annotation(input: &str) -> IResult<&str, AnnotationV1> {
    let (input, _) = pchar('@')(input)?;
    let (input, name) = parse_qualified_ident(input)?;
    let (input, args) = opt(delimited(
        preceded(multispace0, pchar('(')),
        separated_list0(preceded(multispace0, pchar(',')), parse_annotation_arg),
        preceded(multispace0, pchar(')')),
    ))(input)?;
    Ok((
        input,
        AnnotationV1 {
            name: name.to_string(),
            args: args.unwrap_or_default(),
        },
    ))
}

fn parse_trailing_annotations(input: &str) -> IResult<&str, Vec<AnnotationV1>> {
    many0(preceded(multispace0, parse_annotation))(input)
}

fn parse_annotation_line(line: &str) -> Result<Vec<AnnotationV1>, String> {
    fn parser(input: &str) -> IResult<&str, Vec<AnnotationV1>> {
        let (input, first) = parse_annotation(input)?;
        let (input, mut rest) = parse_trailing_annotations(input)?;
        let (input, _) = multispace0(input)?;
        rest.insert(0, first);
        Ok((input, rest))
    }

    all_consuming(parser)(line)
        .map(|(_, v)| v)
        .map_err(|_| format!("malformed annotation: {line}"))
}

fn parse_class_header(line: &str) -> Result<ClassDeclV1, String> {
    fn parser(input: &str) -> IResult<&str, ClassDeclV1> {
        let (input, is_abstract) = opt(pair(tag("abstract"), multispace1))(input)?;
        let (input, _) = tag("class")(input)?;
        let (input, _) = multispace1(input)?;
        let (input, name) = parse_qualified_ident(input)?;
        let (input, superclass) = opt(preceded(
            tuple((multispace1, tag("extends"), multispace1)),
            parse_qualified_ident,
        ))(input)?;
        let (input, annotations) = parse_trailing_annotations(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = opt(pchar(':'))(input)?;
        let (input, _) = multispace0(input)?;
        Ok((
            input,
            ClassDeclV1 {
                name: name.to_string(),
                superclass: superclass.map(str::to_string),
                is_abstract: is_abstract.is_some(),
                annotations,
                methods: vec![],
            },
        ))
    }

    all_consuming(parser)(line)
        .map(|(_, v)| v)
        .map_err(|_| {
            "class header expects: `[abstract] class <Name> [extends <Super>]:`".to_string()
        })
}

fn parse_param_decl(input: &str) -> IResult<&str, ParamDeclV1> {
    let (input, annotations) = many0(preceded(multispace0, parse_annotation))(input)?;
    let (input, name) = preceded(multispace0, parse_ident)(input)?;
    let (input, _) = preceded(multispace0, pchar(':'))(input)?;
    let (input, ty) = preceded(multispace0, parse_type_expr)(input)?;
    Ok((
        input,
        ParamDeclV1 {
            name: name.to_string(),
            ty,
            annotations,
        },
    ))
}

fn parse_method_decl(line: &str) -> Result<MethodDeclV1, String> {
    fn visibility(input: &str) -> IResult<&str, VisibilityV1> {
        alt((
            map(tag("public"), |_| VisibilityV1::Public),
            map(tag("protected"), |_| VisibilityV1::Protected),
            map(tag("private"), |_| VisibilityV1::Private),
        ))(input)
    }

    fn parser(input: &str) -> IResult<&str, MethodDeclV1> {
        let (input, visibility) = opt(tuple((visibility, multispace1)))(input)?;
        let (input, is_static) = opt(pair(tag("static"), multispace1))(input)?;
        let (input, is_abstract) = opt(pair(tag("abstract"), multispace1))(input)?;
        let (input, name) = parse_ident(input)?;
        let (input, params) = delimited(
            preceded(multispace0, pchar('(')),
            separated_list0(preceded(multispace0, pchar(',')), parse_param_decl),
            preceded(multispace0, pchar(')')),
        )(input)?;
        let (input, return_type) = opt(preceded(
            tuple((multispace0, tag("->"), multispace0)),
            parse_type_expr,
        ))(input)?;
        let (input, annotations) = parse_trailing_annotations(input)?;
        let (input, _) = multispace0(input)?;

        let return_type = return_type.filter(|ty| *ty != TypeExprV1::scalar("void"));
        Ok((
            input,
            MethodDeclV1 {
                name: name.to_string(),
                visibility: visibility
                    .map(|(v, _)| v)
                    .unwrap_or(VisibilityV1::Public),
                is_static: is_static.is_some(),
                is_abstract: is_abstract.is_some(),
                params,
                return_type,
                annotations,
            },
        ))
    }

    all_consuming(parser)(line)
        .map(|(_, v)| v)
        .map_err(|_| {
            format!(
                "method expects: `[public|protected|private] [static] [abstract] name(p: T, ...) [-> T]`, got: {line}"
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_with_annotated_methods() {
        let text = r#"
module Crm

@DomainObject(nature = ENTITY, logicalTypeName = "crm.Customer")
class crm.Customer extends crm.Party:
  @Property(maxLength = 40)
  public getName() -> String
  public getOrders() -> List<crm.Order>
  private hidePlaceOrder() -> boolean @MemberSupport
  public placeOrder(product: crm.Product, quantity: int) -> crm.Order
"#;
        let module = parse_dom_v1(text).expect("parse");
        assert_eq!(module.module_name, "Crm");
        let class = module.class("crm.Customer").expect("class");
        assert_eq!(class.superclass.as_deref(), Some("crm.Party"));
        assert_eq!(class.annotations.len(), 1);
        assert_eq!(
            class.annotations[0].arg("nature"),
            Some(&AnnotationValueV1::Ident("ENTITY".to_string()))
        );

        let get_name = &class.methods[0];
        assert_eq!(get_name.annotations[0].arg("maxLength").and_then(|v| v.as_int()), Some(40));

        let orders = &class.methods[1];
        assert_eq!(
            orders.return_type,
            Some(TypeExprV1::Collection {
                container: "List".to_string(),
                element: "crm.Order".to_string()
            })
        );

        let hide = &class.methods[2];
        assert_eq!(hide.visibility, VisibilityV1::Private);
        assert_eq!(hide.annotations[0].name, "MemberSupport");

        let place = &class.methods[3];
        assert_eq!(place.params.len(), 2);
        assert_eq!(place.params[1].ty, TypeExprV1::scalar("int"));
    }

    #[test]
    fn void_return_is_none() {
        let module = parse_dom_v1("class a.B:\n  public run() -> void\n  public go()\n").expect("parse");
        let class = module.class("a.B").expect("class");
        assert!(class.methods.iter().all(|m| m.return_type.is_none()));
    }

    #[test]
    fn positional_annotation_argument_is_named_value() {
        let module =
            parse_dom_v1("class a.B:\n  @Named(\"Full # Name\")\n  public getX() -> String\n")
                .expect("parse");
        let ann = &module.classes[0].methods[0].annotations[0];
        assert_eq!(ann.arg("value").and_then(|v| v.as_text()), Some("Full # Name"));
    }

    #[test]
    fn rejects_methods_outside_a_class() {
        let err = parse_dom_v1("public getX() -> String").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn rejects_dangling_annotations() {
        let err = parse_dom_v1("class a.B:\n  @Property\n").unwrap_err();
        assert!(err.to_string().contains("dangling annotations"));
    }
}
