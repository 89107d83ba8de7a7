//! In-memory double of the membado web API for tests.
//!
//! Every endpoint is POST with an `application/x-www-form-urlencoded`
//! body, answers with the `{"success": …, "result": …}` envelope, and
//! checks the `apikey` parameter. Application failure is always carried in
//! the envelope, never in the HTTP status; the real service behaves the
//! same way.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, routing::post, Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// The API key the server accepts. Anything else gets `{"success": false}`.
pub const API_KEY: &str = "test-api-key";

const VALID_OPTIN_STATUSES: [&str; 3] = ["undefiniert", "single", "abgemeldet"];

/// Form parameters that steer a request rather than carry contact fields.
const CONTROL_PARAMS: [&str; 6] = ["apikey", "contact_id", "contact_mail", "tags_add", "tags_remove", "optin_id"];

/// The fixed-shape parameters shared by the endpoints. Unknown form keys
/// are ignored; only `create_or_update` needs the free-form field map.
#[derive(Debug, Default, Deserialize)]
pub struct ApiParams {
    pub apikey: Option<String>,
    pub contact_id: Option<String>,
    pub contact_mail: Option<String>,
    pub tags: Option<String>,
    pub optin_id: Option<String>,
    pub optin_status: Option<String>,
}

impl ApiParams {
    fn authorized(&self) -> bool {
        self.apikey.as_deref() == Some(API_KEY)
    }
}

#[derive(Clone, Debug)]
pub struct Contact {
    pub id: u64,
    pub mail: String,
    pub fields: HashMap<String, String>,
    pub optin_status: String,
    pub tag_ids: Vec<u64>,
}

#[derive(Debug)]
pub struct Store {
    pub contacts: HashMap<u64, Contact>,
    next_id: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self { contacts: HashMap::new(), next_id: 1 }
    }
}

pub type Db = Arc<RwLock<Store>>;

/// The account's tag catalogue, id → name.
pub fn tag_catalogue() -> Vec<(u64, &'static str)> {
    vec![(1, "Newsletter"), (2, "Kunde"), (3, "Interessent")]
}

/// The account's field catalogue, id → label. Mixes system fields and
/// custom fields so prefix filtering is observable.
pub fn field_catalogue() -> Vec<(&'static str, &'static str)> {
    vec![
        ("mail", "E-Mail"),
        ("vorname", "Vorname"),
        ("nachname", "Nachname"),
        ("customfield_17", "Schuhgroesse"),
        ("customfield_23", "Lieblingsfarbe"),
    ]
}

/// The account's opt-in processes, id → name.
pub fn optin_catalogue() -> Vec<(u64, &'static str)> {
    vec![(1, "Newsletter Optin"), (2, "Webinar Optin")]
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/auth", post(auth))
        .route("/tags", post(tags))
        .route("/fields", post(fields))
        .route("/optins", post(optins))
        .route("/contact", post(contact))
        .route("/contact/tags", post(contact_tags))
        .route("/contact/create_or_update", post(contact_create_update))
        .route("/contact/fields/get", post(contact_fields))
        .route("/contact/set-optin-status", post(contact_set_optin))
        .route("/contact/optin/start", post(contact_start_optin))
        .route("/contact/tags/add", post(contact_tags_add))
        .route("/contact/tags/remove", post(contact_tags_remove))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn fail() -> Json<Value> {
    Json(json!({"success": false}))
}

fn ok(result: Value) -> Json<Value> {
    Json(json!({"success": true, "result": result}))
}

/// Parse a comma-joined id list, dropping anything non-numeric.
pub fn parse_id_list(raw: &str) -> Vec<u64> {
    raw.split(',').filter_map(|part| part.trim().parse().ok()).collect()
}

fn find_contact<'a>(store: &'a Store, params: &ApiParams) -> Option<&'a Contact> {
    if let Some(id) = params.contact_id.as_deref().and_then(|raw| raw.parse::<u64>().ok()) {
        return store.contacts.get(&id);
    }
    let mail = params.contact_mail.as_deref()?;
    store.contacts.values().find(|contact| contact.mail == mail)
}

/// Flatten a contact into the record object the `/contact` endpoint
/// returns.
pub fn contact_record(contact: &Contact) -> Value {
    let mut record = Map::new();
    record.insert("id".to_string(), json!(contact.id.to_string()));
    record.insert("mail".to_string(), json!(contact.mail));
    record.insert("optin_status".to_string(), json!(contact.optin_status));
    for (name, value) in &contact.fields {
        record.insert(name.clone(), json!(value));
    }
    Value::Object(record)
}

async fn auth(Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    Json(json!({"success": true}))
}

async fn tags(Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let tags: Map<String, Value> =
        tag_catalogue().into_iter().map(|(id, name)| (id.to_string(), json!(name))).collect();
    ok(json!({ "tags": tags }))
}

async fn fields(Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let fields: Map<String, Value> =
        field_catalogue().into_iter().map(|(id, label)| (id.to_string(), json!(label))).collect();
    ok(json!({ "fields": fields }))
}

async fn optins(Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let optins: Map<String, Value> =
        optin_catalogue().into_iter().map(|(id, name)| (id.to_string(), json!(name))).collect();
    ok(json!({ "optins": optins }))
}

async fn contact(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let store = db.read().await;
    match find_contact(&store, &params) {
        Some(contact) => ok(contact_record(contact)),
        None => fail(),
    }
}

async fn contact_tags(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let store = db.read().await;
    let Some(contact) = find_contact(&store, &params) else {
        return fail();
    };
    let names: HashMap<u64, &str> = tag_catalogue().into_iter().collect();
    let tags: Map<String, Value> = contact
        .tag_ids
        .iter()
        .filter_map(|id| names.get(id).map(|name| (id.to_string(), json!(name))))
        .collect();
    ok(json!({ "tags": tags }))
}

async fn contact_create_update(
    State(db): State<Db>,
    Form(raw): Form<HashMap<String, String>>,
) -> Json<Value> {
    let params = ApiParams {
        apikey: raw.get("apikey").cloned(),
        contact_id: raw.get("contact_id").cloned(),
        contact_mail: raw.get("contact_mail").cloned(),
        optin_id: raw.get("optin_id").cloned(),
        ..ApiParams::default()
    };
    if !params.authorized() {
        return fail();
    }
    let mut store = db.write().await;

    let existing_id = find_contact(&store, &params).map(|contact| contact.id);
    let id = match existing_id {
        Some(id) => id,
        None => {
            // New contacts need an address to be reachable at.
            let mail = params.contact_mail.clone().or_else(|| raw.get("mail").cloned());
            let Some(mail) = mail else {
                return fail();
            };
            let id = store.next_id;
            store.next_id += 1;
            store.contacts.insert(
                id,
                Contact {
                    id,
                    mail,
                    fields: HashMap::new(),
                    optin_status: "undefiniert".to_string(),
                    tag_ids: Vec::new(),
                },
            );
            id
        }
    };

    let contact = store.contacts.get_mut(&id).expect("contact just resolved");
    for (name, value) in &raw {
        if CONTROL_PARAMS.contains(&name.as_str()) {
            continue;
        }
        contact.fields.insert(name.clone(), value.clone());
    }
    if let Some(add) = raw.get("tags_add") {
        for tag in parse_id_list(add) {
            if !contact.tag_ids.contains(&tag) {
                contact.tag_ids.push(tag);
            }
        }
    }
    if let Some(remove) = raw.get("tags_remove") {
        let remove = parse_id_list(remove);
        contact.tag_ids.retain(|tag| !remove.contains(tag));
    }
    if let Some(optin) = params.optin_id.as_deref() {
        let known: Vec<u64> = optin_catalogue().into_iter().map(|(id, _)| id).collect();
        match optin.parse::<u64>() {
            Ok(optin) if known.contains(&optin) => contact.optin_status = "single".to_string(),
            _ => return fail(),
        }
    }
    Json(json!({"success": true}))
}

async fn contact_fields(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let store = db.read().await;
    let Some(contact) = find_contact(&store, &params) else {
        return fail();
    };
    // The field ids arrive in the `tags` parameter.
    let requested = params.tags.as_deref().unwrap_or_default();
    let values: Map<String, Value> = requested
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            let value = contact.fields.get(id).map_or(Value::Null, |v| json!(v));
            (id.to_string(), value)
        })
        .collect();
    ok(Value::Object(values))
}

async fn contact_set_optin(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let Some(status) = params.optin_status.clone() else {
        return fail();
    };
    if !VALID_OPTIN_STATUSES.contains(&status.as_str()) {
        return fail();
    }
    let mut store = db.write().await;
    let Some(id) = find_contact(&store, &params).map(|contact| contact.id) else {
        return fail();
    };
    store.contacts.get_mut(&id).expect("contact just resolved").optin_status = status;
    Json(json!({"success": true}))
}

async fn contact_start_optin(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let Some(optin) = params.optin_id.as_deref().and_then(|raw| raw.parse::<u64>().ok()) else {
        return fail();
    };
    if !optin_catalogue().iter().any(|(id, _)| *id == optin) {
        return fail();
    }
    let store = db.read().await;
    if find_contact(&store, &params).is_none() {
        return fail();
    }
    Json(json!({"success": true}))
}

async fn contact_tags_add(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let mut store = db.write().await;
    let Some(id) = find_contact(&store, &params).map(|contact| contact.id) else {
        return fail();
    };
    let contact = store.contacts.get_mut(&id).expect("contact just resolved");
    for tag in parse_id_list(params.tags.as_deref().unwrap_or_default()) {
        if !contact.tag_ids.contains(&tag) {
            contact.tag_ids.push(tag);
        }
    }
    Json(json!({"success": true}))
}

async fn contact_tags_remove(State(db): State<Db>, Form(params): Form<ApiParams>) -> Json<Value> {
    if !params.authorized() {
        return fail();
    }
    let mut store = db.write().await;
    let Some(id) = find_contact(&store, &params).map(|contact| contact.id) else {
        return fail();
    };
    let contact = store.contacts.get_mut(&id).expect("contact just resolved");
    let remove = parse_id_list(params.tags.as_deref().unwrap_or_default());
    contact.tag_ids.retain(|tag| !remove.contains(tag));
    Json(json!({"success": true}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_list_drops_garbage() {
        assert_eq!(parse_id_list("1,2,3"), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 1 , x , 3 "), vec![1, 3]);
        assert_eq!(parse_id_list(""), Vec::<u64>::new());
    }

    #[test]
    fn catalogues_are_seeded() {
        assert!(!tag_catalogue().is_empty());
        assert!(field_catalogue().iter().any(|(id, _)| id.starts_with("customfield_")));
        assert!(!optin_catalogue().is_empty());
    }

    #[test]
    fn api_params_deserialize_from_form_encoding() {
        let params: ApiParams =
            serde_urlencoded::from_str("apikey=test-api-key&contact_id=42&tags=1%2C2").unwrap();
        assert!(params.authorized());
        assert_eq!(params.contact_id.as_deref(), Some("42"));
        assert_eq!(params.tags.as_deref(), Some("1,2"));
        assert!(params.contact_mail.is_none());
    }

    #[test]
    fn contact_record_flattens_fields() {
        let mut fields = HashMap::new();
        fields.insert("vorname".to_string(), "Ada".to_string());
        let contact = Contact {
            id: 7,
            mail: "ada@example.com".to_string(),
            fields,
            optin_status: "single".to_string(),
            tag_ids: vec![1],
        };
        let record = contact_record(&contact);
        assert_eq!(record["id"], "7");
        assert_eq!(record["mail"], "ada@example.com");
        assert_eq!(record["optin_status"], "single");
        assert_eq!(record["vorname"], "Ada");
    }

    #[test]
    fn wrong_api_key_is_not_authorized() {
        let params = ApiParams { apikey: Some("wrong".to_string()), ..ApiParams::default() };
        assert!(!params.authorized());
        assert!(!ApiParams::default().authorized());
    }
}
