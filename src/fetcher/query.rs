//! Query construction for Socrata-style endpoints
//!
//! [`SodaQuery`] assembles the `$`-prefixed parameter set for one request;
//! [`RecordFilter`] is the enumerated filter surface that compiles down to
//! a `$where` predicate. The fetcher itself treats both the predicate and
//! the sort directive as opaque strings - everything semantic about them
//! lives here.

/// Escape a value for embedding in a single-quoted SoQL string literal
fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Parameters for one request against a tabular resource.
///
/// Unset fields are omitted from the request. `params` emits the pairs in
/// a canonical order so that two equal queries always produce the same
/// URL and the same cache fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SodaQuery {
    select: Option<String>,
    where_clause: Option<String>,
    group: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SodaQuery {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `$select` projection/aggregation expression
    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Set the `$where` predicate (opaque server-side filter string)
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Set the `$group` expression for aggregation queries
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the `$order` sort directive
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Set the `$limit` page size
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the `$offset` pagination cursor
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The `$limit` page size, if set
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Emit the populated parameters as request query pairs, in canonical
    /// order
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(select) = &self.select {
            params.push(("$select", select.clone()));
        }
        if let Some(clause) = &self.where_clause {
            params.push(("$where", clause.clone()));
        }
        if let Some(group) = &self.group {
            params.push(("$group", group.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("$order", order.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("$limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("$offset", offset.to_string()));
        }
        params
    }

    /// Canonical fingerprint of this query against one dataset, used as
    /// the cache key
    pub fn fingerprint(&self, dataset: &str) -> String {
        let joined: Vec<String> =
            self.params().iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{dataset}?{}", joined.join("&"))
    }
}

/// Enumerated server-side filter surface for funding-request datasets.
///
/// Every field is independently optional; populated fields are combined
/// with logical AND. Field names follow the Form 471 dataset; the `raw`
/// escape hatch carries anything this structure cannot express.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Funding year, e.g. 2024
    pub funding_year: Option<u16>,
    /// Two-letter state code (matched exactly, as stored)
    pub state: Option<String>,
    /// Application statuses; more than one value expands to an OR group
    pub statuses: Vec<String>,
    /// Organization-name fragment, matched case-insensitively server-side
    pub organization: Option<String>,
    /// Organization entity type, e.g. "School District"
    pub entity_type: Option<String>,
    /// Service type name
    pub service_type: Option<String>,
    /// Billed entity number
    pub ben: Option<String>,
    /// Raw predicate ANDed in verbatim (parenthesized)
    pub raw: Option<String>,
}

impl RecordFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field is populated
    pub fn is_empty(&self) -> bool {
        self.funding_year.is_none()
            && self.state.is_none()
            && self.statuses.is_empty()
            && self.organization.is_none()
            && self.entity_type.is_none()
            && self.service_type.is_none()
            && self.ben.is_none()
            && self.raw.is_none()
    }

    /// Compile the populated fields into a `$where` predicate.
    ///
    /// Returns `None` when the filter is empty. String values are
    /// single-quote escaped; multi-value statuses become a parenthesized
    /// OR group.
    pub fn to_where_clause(&self) -> Option<String> {
        let mut clauses = Vec::new();

        if let Some(year) = self.funding_year {
            clauses.push(format!("funding_year = '{year}'"));
        }
        if let Some(state) = &self.state {
            clauses.push(format!("state = '{}'", escape(state)));
        }
        match self.statuses.len() {
            0 => {}
            1 => clauses.push(format!(
                "form_471_frn_status_name = '{}'",
                escape(&self.statuses[0])
            )),
            _ => {
                let alternatives: Vec<String> = self
                    .statuses
                    .iter()
                    .map(|s| format!("form_471_frn_status_name = '{}'", escape(s)))
                    .collect();
                clauses.push(format!("({})", alternatives.join(" OR ")));
            }
        }
        if let Some(fragment) = &self.organization {
            clauses.push(format!(
                "upper(organization_name) like '%{}%'",
                escape(&fragment.to_uppercase())
            ));
        }
        if let Some(entity_type) = &self.entity_type {
            clauses.push(format!(
                "organization_entity_type_name = '{}'",
                escape(entity_type)
            ));
        }
        if let Some(service_type) = &self.service_type {
            clauses.push(format!(
                "form_471_service_type_name = '{}'",
                escape(service_type)
            ));
        }
        if let Some(ben) = &self.ben {
            clauses.push(format!("ben = '{}'", escape(ben)));
        }
        if let Some(raw) = &self.raw {
            clauses.push(format!("({raw})"));
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" AND "))
        }
    }
}
