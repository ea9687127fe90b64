//! Builds the nested organization hierarchy from flat rows.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::OrgUnit;

/// Raised when the stored parent links do not form a forest: a cycle, a
/// duplicated objid, or rows unreachable from any root. The create-time
/// guard prevents this, so hitting it means the data was edited directly.
#[derive(Debug, Error)]
#[error("organization hierarchy is corrupted near objid '{0}': cycle or dangling parent reference")]
pub struct CycleDetected(pub String);

#[derive(Debug, Serialize)]
pub struct OrgNode {
    #[serde(flatten)]
    pub org: OrgUnit,
    pub level: i32,
    pub path: Vec<String>,
    pub employee_count: i64,
    pub children: Vec<OrgNode>,
}

/// Roots are rows with a null `parent_objid`; children are attached by
/// repeated parent lookup and ordered ascending by objid, matching the flat
/// listing. Every node carries its depth and root-to-self objid chain.
pub fn build_forest(
    rows: &[OrgUnit],
    employee_counts: &HashMap<String, i64>,
) -> Result<Vec<OrgNode>, CycleDetected> {
    let mut by_parent: HashMap<Option<&str>, Vec<&OrgUnit>> = HashMap::new();
    for row in rows {
        by_parent.entry(row.parent_objid.as_deref()).or_default().push(row);
    }
    for children in by_parent.values_mut() {
        children.sort_by(|a, b| a.objid.cmp(&b.objid));
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut forest = Vec::new();
    for root in by_parent.get(&None).cloned().unwrap_or_default() {
        forest.push(attach(root, 0, &[], &by_parent, employee_counts, &mut visited)?);
    }

    if visited.len() != rows.len() {
        let stranded = rows
            .iter()
            .find(|r| !visited.contains(r.objid.as_str()))
            .map(|r| r.objid.clone())
            .unwrap_or_default();
        return Err(CycleDetected(stranded));
    }

    Ok(forest)
}

fn attach<'a>(
    row: &'a OrgUnit,
    level: i32,
    ancestors: &[String],
    by_parent: &HashMap<Option<&'a str>, Vec<&'a OrgUnit>>,
    employee_counts: &HashMap<String, i64>,
    visited: &mut HashSet<&'a str>,
) -> Result<OrgNode, CycleDetected> {
    if !visited.insert(row.objid.as_str()) {
        return Err(CycleDetected(row.objid.clone()));
    }

    let mut path = ancestors.to_vec();
    path.push(row.objid.clone());

    let mut children = Vec::new();
    for child in by_parent
        .get(&Some(row.objid.as_str()))
        .cloned()
        .unwrap_or_default()
    {
        children.push(attach(child, level + 1, &path, by_parent, employee_counts, visited)?);
    }

    Ok(OrgNode {
        org: row.clone(),
        level,
        path,
        employee_count: employee_counts
            .get(&row.objid)
            .copied()
            .unwrap_or(0),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::dates::WireDate;

    fn unit(objid: &str, parent: Option<&str>) -> OrgUnit {
        OrgUnit {
            objid: objid.to_string(),
            otype: "O".to_string(),
            short: format!("S{objid}"),
            stext: format!("Org {objid}"),
            parent_objid: parent.map(str::to_string),
            begda: "01.01.2020".parse::<WireDate>().unwrap(),
            endda: "31.12.2099".parse::<WireDate>().unwrap(),
            responsible_objid: None,
            costcenter: None,
            location: None,
            org_level: "Abteilung".to_string(),
        }
    }

    #[test]
    fn builds_forest_with_levels_and_paths() {
        let rows = vec![
            unit("1000", None),
            unit("1100", Some("1000")),
            unit("1110", Some("1100")),
            unit("2000", None),
        ];
        let forest = build_forest(&rows, &HashMap::new()).unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].org.objid, "1000");
        assert_eq!(forest[0].level, 0);
        assert_eq!(forest[0].children[0].org.objid, "1100");
        assert_eq!(forest[0].children[0].level, 1);
        assert_eq!(
            forest[0].children[0].children[0].path,
            vec!["1000", "1100", "1110"]
        );
    }

    #[test]
    fn orders_children_by_objid() {
        let rows = vec![
            unit("1000", None),
            unit("1300", Some("1000")),
            unit("1100", Some("1000")),
            unit("1200", Some("1000")),
        ];
        let forest = build_forest(&rows, &HashMap::new()).unwrap();
        let ids: Vec<&str> = forest[0]
            .children
            .iter()
            .map(|c| c.org.objid.as_str())
            .collect();
        assert_eq!(ids, vec!["1100", "1200", "1300"]);
    }

    #[test]
    fn attaches_employee_counts() {
        let rows = vec![unit("1000", None), unit("1100", Some("1000"))];
        let counts = HashMap::from([("1100".to_string(), 3_i64)]);
        let forest = build_forest(&rows, &counts).unwrap();
        assert_eq!(forest[0].employee_count, 0);
        assert_eq!(forest[0].children[0].employee_count, 3);
    }

    #[test]
    fn is_idempotent() {
        let rows = vec![
            unit("1000", None),
            unit("1100", Some("1000")),
            unit("1200", Some("1000")),
        ];
        let a = build_forest(&rows, &HashMap::new()).unwrap();
        let b = build_forest(&rows, &HashMap::new()).unwrap();
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    #[test]
    fn detects_two_node_cycle() {
        let rows = vec![unit("A", Some("B")), unit("B", Some("A"))];
        assert!(build_forest(&rows, &HashMap::new()).is_err());
    }

    #[test]
    fn detects_self_reference() {
        let rows = vec![unit("1000", None), unit("X", Some("X"))];
        assert!(build_forest(&rows, &HashMap::new()).is_err());
    }

    #[test]
    fn rejects_dangling_parent_reference() {
        let rows = vec![unit("1000", None), unit("1100", Some("9999"))];
        assert!(build_forest(&rows, &HashMap::new()).is_err());
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        let forest = build_forest(&[], &HashMap::new()).unwrap();
        assert!(forest.is_empty());
    }
}
