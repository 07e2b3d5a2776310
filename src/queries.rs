//! Query documents. The profile query comes in four variants because
//! deployments differ on whether `user.createdAt` and
//! `transaction.objectId` exist.

macro_rules! user_selection {
    (with_created_at) => {
        "  user {\n    id\n    login\n    createdAt\n    email\n    firstName\n    lastName\n    campus\n    auditRatio\n    avatarUrl\n    discordLogin\n    githubId\n  }\n"
    };
    () => {
        "  user {\n    id\n    login\n    email\n    firstName\n    lastName\n    campus\n    auditRatio\n    avatarUrl\n    discordLogin\n    githubId\n  }\n"
    };
}

macro_rules! results_and_progress {
    () => {
        r#"
  results: result(order_by: { createdAt: desc }, limit: 200) {
    id
    objectId
    grade
    type
    path
    createdAt
  }
  progress: progress(order_by: { updatedAt: desc }, limit: 50) {
    objectId
    grade
    createdAt
    updatedAt
    path
  }
"#
    };
}

macro_rules! profile_body {
    () => {
        r#"
  nestedCheck: result(limit: 1, order_by: { createdAt: desc }) {
    id
    user {
      id
      login
    }
  }
  levels: transaction(where: { type: { _eq: "level" } }, order_by: { createdAt: desc }, limit: 1) {
    amount
  }
  transactions: transaction(where: { type: { _eq: "xp" } }, order_by: { createdAt: desc }, limit: 2000) {
    amount
    createdAt
    path
    type
    objectId
  }
  auditsDone: transaction(where: { type: { _eq: "up" } }, order_by: { createdAt: desc }, limit: 500) {
    amount
    createdAt
    path
    type
  }
  auditsReceived: transaction(where: { type: { _eq: "down" } }, order_by: { createdAt: desc }, limit: 500) {
    amount
    createdAt
    path
    type
  }
  topProjects: transaction(
    where: {
      type: { _eq: "xp" }
      _and: [
        { path: { _nlike: "%exam%" } }
        { path: { _nlike: "%exercise%" } }
        { path: { _nlike: "%checkpoint%" } }
        { path: { _nlike: "%piscine%" } }
      ]
    }
    order_by: { amount: desc }
    limit: 10
  ) {
    amount
    createdAt
    path
  }
  skills: transaction(
    where: { type: { _like: "skill_%" } }
    distinct_on: [type]
    order_by: [{ type: asc }, { amount: desc }]
  ) {
    type
    amount
    path
    createdAt
  }
  passedProjects: result(
    where: {
      grade: { _gt: 0 }
      _and: [
        { path: { _nlike: "%exam%" } }
        { path: { _nlike: "%exercise%" } }
        { path: { _nlike: "%checkpoint%" } }
        { path: { _nlike: "%piscine%" } }
      ]
    }
    order_by: { createdAt: desc }
    limit: 200
  ) {
    path
    grade
    createdAt
    type
  }
  failedProjects: result(
    where: {
      grade: { _eq: 0 }
      _and: [
        { path: { _nlike: "%exam%" } }
        { path: { _nlike: "%exercise%" } }
        { path: { _nlike: "%checkpoint%" } }
        { path: { _nlike: "%piscine%" } }
      ]
    }
    order_by: { createdAt: desc }
    limit: 200
  ) {
    path
    grade
    createdAt
    type
  }
"#
    };
}

macro_rules! legacy_body {
    () => {
        r#"
  levels: transaction(where: { type: { _eq: "level" } }, order_by: { createdAt: desc }, limit: 1) {
    amount
  }
  transactions: transaction(where: { type: { _eq: "xp" } }, order_by: { createdAt: desc }, limit: 400) {
    amount
    createdAt
    path
    type
  }
  skills: transaction(where: { type: { _like: "skill_%" } }, order_by: { amount: desc }) {
    type
    amount
    path
  }
"#
    };
}

pub const PROFILE_QUERY: &str = concat!(
    "query ProfileData {\n",
    user_selection!(with_created_at),
    profile_body!(),
    results_and_progress!(),
    "}\n"
);

pub const PROFILE_QUERY_FALLBACK: &str = concat!(
    "query ProfileDataFallback {\n",
    user_selection!(),
    profile_body!(),
    results_and_progress!(),
    "}\n"
);

pub const PROFILE_QUERY_LEGACY: &str = concat!(
    "query ProfileDataLegacy {\n",
    user_selection!(with_created_at),
    legacy_body!(),
    results_and_progress!(),
    "}\n"
);

pub const PROFILE_QUERY_LEGACY_FALLBACK: &str = concat!(
    "query ProfileDataLegacyFallback {\n",
    user_selection!(),
    legacy_body!(),
    results_and_progress!(),
    "}\n"
);

pub const TRANSACTIONS_PAGE_QUERY: &str = r#"
query TransactionsPageData {
  transactions: transaction(
    where: { type: { _eq: "xp" } }
    order_by: { createdAt: desc }
    limit: 2000
  ) {
    amount
    createdAt
    path
    type
    objectId
  }
}
"#;

pub const PROJECTS_PAGE_QUERY: &str = r#"
query ProjectsPageData {
  results: result(order_by: { createdAt: desc }, limit: 2000) {
    id
    objectId
    grade
    type
    path
    createdAt
  }
  progress: progress(order_by: { updatedAt: desc }, limit: 50) {
    objectId
    grade
    createdAt
    updatedAt
    path
  }
}
"#;

pub const OBJECTS_BY_IDS_QUERY: &str = r#"
query ObjectsByIds($ids: [Int!]) {
  object(where: { id: { _in: $ids } }) {
    id
    name
    type
  }
}
"#;

/// Some accounts expose `user.xps`, which matches the platform total better
/// than summing transactions.
pub const USER_XPS_TOTAL_QUERY: &str = r#"
query UserXpsTotal {
  user {
    login
    xps(
      where: {
        _or: [
          { originEventId: { _eq: 763 } }
          {
            path: {
              _like: "/bahrain/bh-module/piscine-%"
              _nlike: "/bahrain/bh-module/piscine-%/%"
            }
          }
        ]
      }
    ) {
      amount
    }
  }
}
"#;

/// Probes the result -> user relationship; absent on some schemas.
pub const NESTED_REQUIREMENT_QUERY: &str = r#"
query NestedRequirementCheck {
  result(limit: 1) {
    id
    user {
      id
      login
    }
  }
}
"#;
