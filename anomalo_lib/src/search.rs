//! Unique-match lookups over list endpoints.
//!
//! The API offers no query by static ID, ref, channel description or
//! organization name, so each lookup fetches the whole collection and scans
//! it. None of these natural keys is enforced unique by the service; finding
//! two matches is reported instead of picking one.

use crate::client::Client;
use crate::error::{AmbiguousMatch, Error};
use crate::models::{Check, NotificationChannel, Organization};
use tracing::debug;

/// Notification channel types accepted by
/// [`Client::get_notification_channel_with_description_containing`].
pub const VALID_NOTIFICATION_CHANNELS: [&str; 7] = [
    "email",
    "email_all",
    "msteams",
    "opsgenie",
    "pagerduty",
    "slack",
    "webhook",
];

/// Outcome of scanning a collection for a single match.
#[derive(Debug, Clone, PartialEq)]
pub enum Match<T> {
    Absent,
    Unique(T),
    /// Every matching element, in collection order (always two or more).
    Ambiguous(Vec<T>),
}

impl<T> Match<T> {
    /// `Absent` becomes `None`; `Ambiguous` becomes the error built by `describe`.
    pub fn into_result<F>(self, describe: F) -> Result<Option<T>, AmbiguousMatch>
    where
        F: FnOnce(&[T]) -> AmbiguousMatch,
    {
        match self {
            Match::Absent => Ok(None),
            Match::Unique(item) => Ok(Some(item)),
            Match::Ambiguous(items) => Err(describe(&items)),
        }
    }
}

/// Linear scan of `items` keeping those that satisfy `predicate`.
pub fn find_unique<T, I, P>(items: I, mut predicate: P) -> Match<T>
where
    I: IntoIterator<Item = T>,
    P: FnMut(&T) -> bool,
{
    let mut matches: Vec<T> = items.into_iter().filter(|item| predicate(item)).collect();
    if matches.len() > 1 {
        return Match::Ambiguous(matches);
    }
    match matches.pop() {
        Some(item) => Match::Unique(item),
        None => Match::Absent,
    }
}

fn id_label(id: Option<i64>) -> String {
    id.map_or_else(|| "?".to_string(), |id| id.to_string())
}

fn check_label(check: &Check) -> String {
    format!("check ID {}", id_label(check.check_id))
}

impl Client {
    /// Find the check on `table_id` whose static ID is `static_id`.
    pub async fn get_check_by_static_id(
        &self,
        table_id: i64,
        static_id: i64,
    ) -> Result<Option<Check>, Error> {
        let checks = self.get_checks(table_id).await?.checks;
        find_unique(checks, |c| c.check_static_id == Some(static_id))
            .into_result(|found| AmbiguousMatch {
                description: format!(
                    "saw more than one check with the same static ID {static_id} for table {table_id}"
                ),
                candidates: found.iter().map(check_label).collect(),
            })
            .map_err(Error::from)
    }

    /// Find the check on `table_id` whose ref is `check_ref`.
    pub async fn get_check_by_ref(
        &self,
        table_id: i64,
        check_ref: &str,
    ) -> Result<Option<Check>, Error> {
        let checks = self.get_checks(table_id).await?.checks;
        find_unique(checks, |c| c.check_ref.as_deref() == Some(check_ref))
            .into_result(|found| AmbiguousMatch {
                description: format!(
                    "saw more than one check with the same ref {check_ref} for table {table_id}"
                ),
                candidates: found.iter().map(check_label).collect(),
            })
            .map_err(Error::from)
    }

    /// Find the channel of `channel_type` whose description contains `needle`.
    ///
    /// Descriptions are free text, hence substring matching.
    pub async fn get_notification_channel_with_description_containing(
        &self,
        needle: &str,
        channel_type: &str,
    ) -> Result<Option<NotificationChannel>, Error> {
        if !VALID_NOTIFICATION_CHANNELS.contains(&channel_type) {
            return Err(Error::InvalidArgument(format!(
                "Invalid channel_type. Must be one of: {}",
                VALID_NOTIFICATION_CHANNELS.join(", ")
            )));
        }
        let channels = self.get_notification_channels().await?.notification_channels;
        find_unique(channels, |ch| {
            ch.channel_type.as_deref() == Some(channel_type)
                && ch.description.as_deref().is_some_and(|d| d.contains(needle))
        })
        .into_result(|found| AmbiguousMatch {
            description: format!(
                "found at least two {channel_type} channels with descriptions containing {needle}"
            ),
            candidates: found
                .iter()
                .map(|ch| {
                    format!(
                        "channel ID {} ({})",
                        id_label(ch.id),
                        ch.description.as_deref().unwrap_or_default()
                    )
                })
                .collect(),
        })
        .map_err(Error::from)
    }

    /// Find the organization named exactly `name` (case-sensitive).
    pub async fn get_organization_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Organization>, Error> {
        let orgs = self.get_organizations().await?;
        debug!(
            name,
            available = ?orgs.iter().filter_map(|o| o.name.as_deref()).collect::<Vec<_>>(),
            "searching organizations"
        );
        find_unique(orgs, |o| o.name.as_deref() == Some(name))
            .into_result(|found| AmbiguousMatch {
                description: format!("found more than one organization named {name}"),
                candidates: found
                    .iter()
                    .map(|o| format!("{name} (ID {})", id_label(o.id)))
                    .collect(),
            })
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn find_unique_three_outcomes() {
        assert_eq!(find_unique(vec![1, 2, 3], |n| *n > 5), Match::Absent);
        assert_eq!(find_unique(vec![1, 2, 3], |n| *n == 2), Match::Unique(2));
        assert_eq!(
            find_unique(vec![1, 2, 3, 4], |n| n % 2 == 0),
            Match::Ambiguous(vec![2, 4])
        );
        assert_eq!(find_unique(Vec::<i32>::new(), |_| true), Match::Absent);
    }

    #[test]
    fn into_result_maps_outcomes() {
        let describe = |found: &[i32]| AmbiguousMatch {
            description: "dup".to_string(),
            candidates: found.iter().map(|n| n.to_string()).collect(),
        };
        assert_eq!(Match::<i32>::Absent.into_result(describe), Ok(None));
        assert_eq!(Match::Unique(7).into_result(describe), Ok(Some(7)));
        let err = Match::Ambiguous(vec![1, 1]).into_result(describe).unwrap_err();
        assert_eq!(err.candidates, vec!["1", "1"]);
    }

    async fn checks_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/v1/get_checks_for_table"))
            .and(query_param("table_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&server)
            .await;
        server
    }

    const CHECKS: &str = r#"{"checks": [
        {"check_id": 10, "check_static_id": 1, "ref": "row_count"},
        {"check_id": 11, "check_static_id": 2, "ref": "freshness"},
        {"check_id": 12, "check_static_id": 2, "ref": "nulls"}
    ]}"#;

    #[tokio::test]
    async fn check_by_static_id() {
        let server = checks_server(CHECKS).await;
        let client = Client::new(server.uri(), "token");

        let check = client.get_check_by_static_id(7, 1).await.unwrap().unwrap();
        assert_eq!(check.check_id, Some(10));

        assert!(client.get_check_by_static_id(7, 99).await.unwrap().is_none());

        let err = client.get_check_by_static_id(7, 2).await.unwrap_err();
        match err {
            Error::Ambiguous(m) => {
                assert_eq!(m.candidates, vec!["check ID 11", "check ID 12"]);
                assert!(m.description.contains("static ID 2 for table 7"));
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_by_ref() {
        let server = checks_server(
            r#"{"checks": [
                {"check_id": 10, "ref": "row_count"},
                {"check_id": 11, "ref": "row_count"},
                {"check_id": 12, "ref": "nulls"}
            ]}"#,
        )
        .await;
        let client = Client::new(server.uri(), "token");

        let check = client.get_check_by_ref(7, "nulls").await.unwrap().unwrap();
        assert_eq!(check.check_id, Some(12));
        assert!(client.get_check_by_ref(7, "missing").await.unwrap().is_none());
        assert!(matches!(
            client.get_check_by_ref(7, "row_count").await,
            Err(Error::Ambiguous(_))
        ));
    }

    #[tokio::test]
    async fn null_collections_mean_absent() {
        let server = checks_server(r#"{"checks": null}"#).await;
        Mock::given(method("GET"))
            .and(path("/api/public/v1/list_notification_channels"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"notification_channels": null}"#),
            )
            .mount(&server)
            .await;
        let client = Client::new(server.uri(), "token");

        assert!(client.get_check_by_ref(7, "nulls").await.unwrap().is_none());
        assert!(client.get_check_by_static_id(7, 1).await.unwrap().is_none());
        assert!(client
            .get_notification_channel_with_description_containing("oncall", "slack")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lookup_propagates_remote_rejection() {
        let server = MockServer::start().await;
        Mock::given(path("/api/public/v1/get_checks_for_table"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;
        let err = Client::new(server.uri(), "token")
            .get_check_by_ref(7, "nulls")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "forbidden");
    }

    #[tokio::test]
    async fn channel_type_validated_before_request() {
        let server = MockServer::start().await;
        Mock::given(path("/api/public/v1/list_notification_channels"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let err = Client::new(server.uri(), "token")
            .get_notification_channel_with_description_containing("oncall", "carrier_pigeon")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("pagerduty"));
    }

    #[tokio::test]
    async fn channel_by_type_and_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/v1/list_notification_channels"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r##"{"notification_channels": [
                    {"id": 1, "channel_type": "slack", "description": "#data-alerts"},
                    {"id": 2, "channel_type": "email", "description": "data-alerts@example.com"},
                    {"id": 3, "channel_type": "slack", "description": "#data-alerts-staging"},
                    {"id": 4, "channel_type": "pagerduty", "description": "payments oncall"}
                ]}"##,
            ))
            .mount(&server)
            .await;
        let client = Client::new(server.uri(), "token");

        let ch = client
            .get_notification_channel_with_description_containing("oncall", "pagerduty")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ch.id, Some(4));

        let ch = client
            .get_notification_channel_with_description_containing("data-alerts", "email")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ch.id, Some(2));

        assert!(client
            .get_notification_channel_with_description_containing("oncall", "slack")
            .await
            .unwrap()
            .is_none());

        let err = client
            .get_notification_channel_with_description_containing("data-alerts", "slack")
            .await
            .unwrap_err();
        match err {
            Error::Ambiguous(m) => assert_eq!(
                m.candidates,
                vec![
                    "channel ID 1 (#data-alerts)",
                    "channel ID 3 (#data-alerts-staging)"
                ]
            ),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn organization_by_exact_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/v1/organizations"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {"id": 1, "name": "Acme"},
                    {"id": 2, "name": "acme"},
                    {"id": 3, "name": "Globex"},
                    {"id": 4, "name": "Globex"}
                ]"#,
            ))
            .mount(&server)
            .await;
        let client = Client::new(server.uri(), "token");

        let org = client.get_organization_by_name("acme").await.unwrap().unwrap();
        assert_eq!(org.id, Some(2));
        assert!(client.get_organization_by_name("ACME").await.unwrap().is_none());

        let err = client.get_organization_by_name("Globex").await.unwrap_err();
        match err {
            Error::Ambiguous(m) => {
                assert_eq!(m.candidates, vec!["Globex (ID 3)", "Globex (ID 4)"])
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }
}
