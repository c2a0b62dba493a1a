//! Response bodies of the CouchDB/Cloudant REST API.

use serde::Deserialize;

use crate::types::Document;

/// Error body returned with non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CouchErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub reason: String,
}

impl CouchErrorResponse {
    /// The 404 body means the database itself is missing, not a document.
    pub fn is_missing_database(&self) -> bool {
        self.reason.starts_with("Database does not exist") || self.reason == "no_db_file"
    }
}

/// `GET /{db}/_all_docs?include_docs=true`
#[derive(Debug, Deserialize)]
pub(crate) struct AllDocsResponse {
    #[serde(default)]
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_database_detection() {
        let body: CouchErrorResponse =
            serde_json::from_str(r#"{"error":"not_found","reason":"Database does not exist."}"#)
                .unwrap();
        assert!(body.is_missing_database());

        let body: CouchErrorResponse =
            serde_json::from_str(r#"{"error":"not_found","reason":"missing"}"#).unwrap();
        assert!(!body.is_missing_database());

        let body: CouchErrorResponse =
            serde_json::from_str(r#"{"error":"not_found","reason":"deleted"}"#).unwrap();
        assert!(!body.is_missing_database());
    }

    #[test]
    fn test_all_docs_rows_without_doc() {
        let body: AllDocsResponse = serde_json::from_str(
            r#"{"total_rows":2,"offset":0,"rows":[
                {"id":"a","key":"a","value":{"rev":"1-x"},"doc":{"_id":"a","_rev":"1-x","n":1}},
                {"id":"b","key":"b","value":{"rev":"1-y"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(body.rows.len(), 2);
        assert!(body.rows[0].doc.is_some());
        assert!(body.rows[1].doc.is_none());
    }
}
