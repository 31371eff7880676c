use crate::record::{Node, Record, Snapshot};
use crate::types::Naming;

use super::{DiffError, DiffResult};

/// Lists the dotted paths whose values differ between `a` and `b`.
///
/// Paths are built from declared or external field names according to
/// `naming`. Inlined records contribute their children without a prefix.
pub fn compare<A, B>(a: &A, b: &B, naming: Naming) -> DiffResult<Vec<String>>
where
    A: Record + ?Sized,
    B: Record + ?Sized,
{
    compare_snapshots(&Snapshot::capture(a), &Snapshot::capture(b), naming)
}

/// Snapshot form of [`compare`].
pub fn compare_snapshots(a: &Snapshot, b: &Snapshot, naming: Naming) -> DiffResult<Vec<String>> {
    let mut out = Vec::new();
    diff_into(a, b, naming, &mut out)?;
    Ok(out)
}

fn diff_into(a: &Snapshot, b: &Snapshot, naming: Naming, out: &mut Vec<String>) -> DiffResult<()> {
    if a.type_name() != b.type_name() {
        return Err(DiffError::TypeMismatch {
            left: a.type_name().to_string(),
            right: b.type_name().to_string(),
        });
    }
    if a.entries().len() != b.entries().len() {
        return Err(DiffError::NotARecord {
            type_name: a.type_name().to_string(),
            field: String::from("*"),
        });
    }

    for ((field, left), (other, right)) in a.entries().iter().zip(b.entries()) {
        let not_a_record = || DiffError::NotARecord {
            type_name: a.type_name().to_string(),
            field: field.name.to_string(),
        };
        if field.name != other.name {
            return Err(not_a_record());
        }
        let name = field.name_for(naming);

        let nested = match (left, right) {
            (Node::Transient, Node::Transient) => continue,
            (Node::Leaf { text: l, .. }, Node::Leaf { text: r, .. })
            | (Node::Text { text: l, .. }, Node::Text { text: r, .. }) => {
                if l != r {
                    out.push(name.to_string());
                }
                continue;
            }
            (Node::Absent(_), Node::Absent(_)) => continue,
            (Node::Absent(zero), Node::Record(_)) | (Node::Record(_), Node::Absent(zero)) => {
                zero().field_names(naming)
            }
            (Node::Record(l), Node::Record(r)) => compare_snapshots(l, r, naming)?,
            _ => return Err(not_a_record()),
        };

        if field.inline {
            out.extend(nested);
        } else {
            out.extend(nested.into_iter().map(|child| format!("{name}.{child}")));
        }
    }
    Ok(())
}
