//! Text and JSON renderings of object specifications.

use colored::Colorize;
use serde_json::{json, Value};

use metamodel_core::facetapi::FacetHolder;
use metamodel_core::spec::ObjectMember;
use metamodel_core::{HasFacetHolder, ObjectFeature, ObjectSpecification};

fn facets_json(holder: &FacetHolder) -> Value {
    holder
        .facets()
        .iter()
        .map(|f| {
            json!({
                "type": f.facet_type().name(),
                "derived": f.is_derived(),
                "noop": f.is_noop(),
                "summary": f.summary(),
            })
        })
        .collect()
}

fn member_json(member: &ObjectMember<'_>) -> Value {
    let mut out = json!({
        "id": member.id(),
        "kind": member.feature_type().name(),
        "name": member.friendly_name(),
        "type": member.method().return_type.to_string(),
        "facets": facets_json(member.facet_holder()),
    });
    if let ObjectMember::Action(action) = member {
        out["semantics"] = json!(action.semantics());
        out["parameters"] = action
            .parameters()
            .iter()
            .map(|p| {
                json!({
                    "index": p.index(),
                    "name": p.friendly_name(),
                    "type": p.ty().to_string(),
                    "facets": facets_json(p.facet_holder()),
                })
            })
            .collect();
    }
    out
}

pub fn to_json(spec: &ObjectSpecification) -> Value {
    json!({
        "type": spec.type_name(),
        "logicalTypeName": spec.logical_type_name(),
        "sort": spec.sort(),
        "superclass": spec.superclass_name(),
        "name": spec.friendly_name(),
        "description": spec.description(),
        "facets": facets_json(spec.facet_holder()),
        "members": spec.members().iter().map(member_json).collect::<Vec<_>>(),
    })
}

pub fn print_text(spec: &ObjectSpecification) {
    println!(
        "{} {} ({})",
        spec.sort().name().cyan(),
        spec.type_name().bold(),
        spec.logical_type_name()
    );
    if let Some(superclass) = spec.superclass_name() {
        println!("  extends {superclass}");
    }
    for facet in spec.facet_holder().facets() {
        println!("  {} {}", "facet".dimmed(), facet.summary());
    }
    for member in spec.members() {
        println!(
            "  {} {}: {}",
            member.feature_type().name().yellow(),
            member.id().bold(),
            member.method().return_type
        );
        for facet in member.facet_holder().facets() {
            println!("    {} {}", "facet".dimmed(), facet.summary());
        }
        if let ObjectMember::Action(action) = member {
            for param in action.parameters() {
                println!("    {} {}: {}", "param".dimmed(), param.id(), param.ty());
            }
        }
    }
    println!();
}
