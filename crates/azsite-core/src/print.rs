//! Human-readable resource output.

use std::io::{self, Write};

use crate::types::{PropertiesView, Resource, Tags};

/// Print the identifying fields of a resource, then its properties.
///
/// Every field line is written even when the value is absent.
pub fn print_item<W, R>(out: &mut W, item: &R) -> io::Result<()>
where
    W: Write + ?Sized,
    R: Resource + ?Sized,
{
    writeln!(out, "\tName: {}", item.name().unwrap_or_default())?;
    writeln!(out, "\tId: {}", item.id().unwrap_or_default())?;
    writeln!(out, "\tLocation: {}", item.location())?;
    writeln!(out, "\tTags: {}", format_tags(item.tags()))?;
    print_properties(out, item.properties())
}

/// Print the provisioning block when the properties track provisioning,
/// followed by the blank-line separator.
pub fn print_properties<W: Write + ?Sized>(out: &mut W, props: PropertiesView<'_>) -> io::Result<()> {
    if let PropertiesView::Provisioned(state) = props {
        writeln!(out, "\tProperties:")?;
        writeln!(out, "\t\tProvisioning State: {}", state.unwrap_or_default())?;
    }
    write!(out, "\n\n")
}

fn format_tags(tags: Option<&Tags>) -> String {
    match tags {
        Some(tags) => {
            let pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            format!("{{{}}}", pairs.join(", "))
        }
        None => String::new(),
    }
}
