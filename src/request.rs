//! # Check Run Request Builder
//!
//! Validates the conditional-field rules of the Checks API and serializes
//! request bodies. Fields the caller never set are omitted from the body
//! entirely, never sent as null, so a partial update cannot clobber values
//! the server already holds.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{CheckAction, CheckConclusion, CheckOutput, CheckStatus};

/// Maximum number of requested actions the API accepts per check run
pub const MAX_ACTIONS: usize = 3;

/// Field set shared by create and update requests.
///
/// Everything is optional here; `build_create` enforces the extra fields a
/// creation needs, and both builders enforce the status state machine:
/// `completed` requires `conclusion` and `completed_at`, while `queued` and
/// `in_progress` forbid both.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckRunFields {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub head_branch: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub head_sha: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub external_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CheckStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub conclusion: Option<CheckConclusion>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<CheckOutput>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub actions: Option<Vec<CheckAction>>,
}

/// Build and validate the body of a check run creation request.
///
/// Beyond the shared state-machine rules, a creation requires `name`,
/// `head_branch`, and `head_sha`.
pub fn build_create(fields: &CheckRunFields) -> Result<Value> {
  let required = [
    ("name", fields.name.is_some()),
    ("head_branch", fields.head_branch.is_some()),
    ("head_sha", fields.head_sha.is_some()),
  ];
  for (field, present) in required {
    if !present {
      return Err(Error::Validation(format!(
        "`{field}` is required when creating a check run"
      )));
    }
  }
  validate_status_fields(fields)?;
  serialize(fields)
}

/// Build and validate the body of a check run update request.
///
/// An update targets an already-created run, so none of the creation-only
/// fields are required.
pub fn build_update(fields: &CheckRunFields) -> Result<Value> {
  validate_status_fields(fields)?;
  serialize(fields)
}

fn validate_status_fields(fields: &CheckRunFields) -> Result<()> {
  if fields.status == Some(CheckStatus::Completed) {
    if fields.conclusion.is_none() {
      return Err(Error::Validation(
        "status is `completed` but `conclusion` is missing".to_string(),
      ));
    }
    if fields.completed_at.is_none() {
      return Err(Error::Validation(
        "status is `completed` but `completed_at` is missing".to_string(),
      ));
    }
  } else {
    // queued, in_progress, or no status at all
    if fields.conclusion.is_some() {
      return Err(Error::Validation("`conclusion` requires status `completed`".to_string()));
    }
    if fields.completed_at.is_some() {
      return Err(Error::Validation(
        "`completed_at` requires status `completed`".to_string(),
      ));
    }
  }

  if let Some(actions) = &fields.actions {
    if actions.len() > MAX_ACTIONS {
      return Err(Error::Validation(format!(
        "at most {MAX_ACTIONS} actions are allowed, got {}",
        actions.len()
      )));
    }
  }

  Ok(())
}

fn serialize(fields: &CheckRunFields) -> Result<Value> {
  serde_json::to_value(fields).map_err(|e| Error::Validation(format!("failed to serialize check run request: {e}")))
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::models::{Annotation, AnnotationLevel};

  fn completed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
  }

  fn create_fields() -> CheckRunFields {
    CheckRunFields {
      name: Some("lint".to_string()),
      head_branch: Some("main".to_string()),
      head_sha: Some("abc123".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn test_completed_requires_both_terminal_fields() {
    // (conclusion, completed_at, expected error fragment); only both-present succeeds
    let cases = [
      (Some(CheckConclusion::Success), Some(completed_at()), None),
      (Some(CheckConclusion::Success), None, Some("`completed_at` is missing")),
      (None, Some(completed_at()), Some("`conclusion` is missing")),
      (None, None, Some("`conclusion` is missing")),
    ];

    for (conclusion, completed, expected) in cases {
      let fields = CheckRunFields {
        status: Some(CheckStatus::Completed),
        conclusion,
        completed_at: completed,
        ..create_fields()
      };
      let result = build_create(&fields);
      match expected {
        None => assert!(result.is_ok()),
        Some(fragment) => {
          let err = result.unwrap_err();
          assert!(matches!(err, Error::Validation(_)));
          assert!(err.to_string().contains(fragment), "got: {err}");
        }
      }
    }
  }

  #[test]
  fn test_non_terminal_status_forbids_terminal_fields() {
    for status in [CheckStatus::Queued, CheckStatus::InProgress] {
      let with_conclusion = CheckRunFields {
        status: Some(status),
        conclusion: Some(CheckConclusion::Neutral),
        ..create_fields()
      };
      let err = build_create(&with_conclusion).unwrap_err();
      assert!(err.to_string().contains("`conclusion` requires status `completed`"));

      let with_completed_at = CheckRunFields {
        status: Some(status),
        completed_at: Some(completed_at()),
        ..create_fields()
      };
      let err = build_create(&with_completed_at).unwrap_err();
      assert!(err.to_string().contains("`completed_at` requires status `completed`"));
    }
  }

  #[test]
  fn test_terminal_fields_without_status_are_rejected() {
    let fields = CheckRunFields {
      conclusion: Some(CheckConclusion::Success),
      completed_at: Some(completed_at()),
      ..create_fields()
    };
    assert!(matches!(build_create(&fields), Err(Error::Validation(_))));
  }

  #[test]
  fn test_create_requires_identity_fields() {
    for missing in ["name", "head_branch", "head_sha"] {
      let mut fields = create_fields();
      match missing {
        "name" => fields.name = None,
        "head_branch" => fields.head_branch = None,
        _ => fields.head_sha = None,
      }
      let err = build_create(&fields).unwrap_err();
      assert!(
        err.to_string().contains(&format!("`{missing}`")),
        "expected `{missing}` in: {err}"
      );
    }
  }

  #[test]
  fn test_update_requires_no_identity_fields() {
    let fields = CheckRunFields {
      status: Some(CheckStatus::InProgress),
      ..Default::default()
    };

    let body = build_update(&fields).unwrap();
    // Exactly one key: unset fields are omitted, not sent as null
    assert_eq!(body, json!({ "status": "in_progress" }));
  }

  #[test]
  fn test_create_body_contains_only_supplied_fields() {
    let fields = CheckRunFields {
      status: Some(CheckStatus::Queued),
      ..create_fields()
    };

    let body = build_create(&fields).unwrap();
    assert_eq!(
      body,
      json!({
          "name": "lint",
          "head_branch": "main",
          "head_sha": "abc123",
          "status": "queued"
      })
    );
  }

  #[test]
  fn test_completed_update_body_is_exactly_three_keys() {
    let fields = CheckRunFields {
      status: Some(CheckStatus::Completed),
      conclusion: Some(CheckConclusion::Success),
      completed_at: Some(completed_at()),
      ..Default::default()
    };

    let body = build_update(&fields).unwrap();
    assert_eq!(
      body,
      json!({
          "status": "completed",
          "conclusion": "success",
          "completed_at": "2024-01-01T00:00:00Z"
      })
    );
  }

  #[test]
  fn test_annotation_order_is_preserved() {
    let annotation = |path: &str| Annotation {
      path: path.to_string(),
      start_line: 1,
      end_line: 1,
      annotation_level: AnnotationLevel::Notice,
      message: "note".to_string(),
      title: None,
      raw_details: None,
      start_column: None,
      end_column: None,
    };

    let fields = CheckRunFields {
      status: Some(CheckStatus::InProgress),
      output: Some(CheckOutput {
        title: "lint".to_string(),
        summary: "3 notes".to_string(),
        text: None,
        annotations: vec![annotation("z.rs"), annotation("a.rs"), annotation("m.rs")],
        images: vec![],
      }),
      ..Default::default()
    };

    let body = build_update(&fields).unwrap();
    let paths: Vec<&str> = body["output"]["annotations"]
      .as_array()
      .unwrap()
      .iter()
      .map(|a| a["path"].as_str().unwrap())
      .collect();
    assert_eq!(paths, ["z.rs", "a.rs", "m.rs"]);
    // Empty images sequence is omitted like any other unset field
    assert!(body["output"].get("images").is_none());
  }

  #[test]
  fn test_actions_are_capped_at_three() {
    let action = |id: &str| CheckAction {
      label: "Fix".to_string(),
      description: "Apply the fix".to_string(),
      identifier: id.to_string(),
    };

    let ok = CheckRunFields {
      actions: Some(vec![action("a"), action("b"), action("c")]),
      ..create_fields()
    };
    assert!(build_create(&ok).is_ok());

    let too_many = CheckRunFields {
      actions: Some(vec![action("a"), action("b"), action("c"), action("d")]),
      ..create_fields()
    };
    let err = build_create(&too_many).unwrap_err();
    assert!(err.to_string().contains("at most 3 actions"));
  }
}
