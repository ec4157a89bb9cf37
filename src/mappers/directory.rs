use super::{FamilyResponseMapper, MapError, MapRequest};
use crate::security::ServicePrincipal;
use crate::spec::Family;
use crate::store::{DataAccess, User};
use serde::Serialize;
use serde_json::{json, Value};

const USERS_CONTEXT: &str = "https://graph.microsoft.com/v1.0/$metadata#users";
const SERVICE_PRINCIPALS_CONTEXT: &str =
    "https://graph.microsoft.com/v1.0/$metadata#servicePrincipals";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser<'a> {
    id: &'a str,
    display_name: &'a str,
    user_principal_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mail: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    department: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    office_location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_type: Option<&'a str>,
    account_enabled: bool,
}

impl<'a> From<&'a User> for GraphUser<'a> {
    fn from(u: &'a User) -> Self {
        Self {
            id: &u.id,
            display_name: &u.display_name,
            user_principal_name: &u.user_principal_name,
            mail: u.mail.as_deref(),
            job_title: u.job_title.as_deref(),
            department: u.department.as_deref(),
            office_location: u.office_location.as_deref(),
            user_type: u.user_type.as_deref(),
            account_enabled: u.account_enabled,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphServicePrincipal<'a> {
    id: &'a str,
    app_id: &'a str,
    display_name: &'a str,
    description: &'a str,
    account_enabled: bool,
    service_principal_type: &'static str,
}

impl<'a> From<&'a ServicePrincipal> for GraphServicePrincipal<'a> {
    fn from(sp: &'a ServicePrincipal) -> Self {
        Self {
            id: &sp.object_id,
            app_id: &sp.application_id,
            display_name: &sp.display_name,
            description: &sp.description,
            account_enabled: sp.enabled,
            service_principal_type: "Application",
        }
    }
}

fn to_value<T: Serialize>(v: T) -> Result<Value, MapError> {
    serde_json::to_value(v).map_err(|e| MapError::Internal(e.to_string()))
}

/// Apply `$top` when it parses as a count.
fn limit(req: &MapRequest<'_>, items: Vec<Value>) -> Vec<Value> {
    match req.param("$top").and_then(|t| t.parse::<usize>().ok()) {
        Some(top) => items.into_iter().take(top).collect(),
        None => items,
    }
}

fn lookup_key<'a>(req: &MapRequest<'a>, primary: &str) -> Option<&'a str> {
    req.param(primary).or_else(|| req.param("id"))
}

/// Directory family: users and service principals.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryMapper;

impl DirectoryMapper {
    fn users(req: &MapRequest<'_>, data: &dyn DataAccess) -> Result<Option<Value>, MapError> {
        let key = lookup_key(req, "user-id");
        match req.method.as_str() {
            "GET" | "HEAD" => match key {
                Some(key) => {
                    let user = data
                        .find_user(key)
                        .ok_or_else(|| MapError::not_found("user", key))?;
                    to_value(GraphUser::from(user)).map(Some)
                }
                None => {
                    let users = data
                        .users()
                        .into_iter()
                        .map(|u| to_value(GraphUser::from(u)))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some(json!({
                        "@odata.context": USERS_CONTEXT,
                        "value": limit(req, users),
                    })))
                }
            },
            "POST" | "PATCH" => Ok(Some(json!({
                "id": key.unwrap_or_default(),
                "userPrincipalName": req.param("userPrincipalName").unwrap_or_default(),
                "displayName": req.param("displayName").unwrap_or_default(),
            }))),
            "DELETE" => Ok(None),
            other => Err(MapError::UnsupportedMethod(other.to_string())),
        }
    }

    fn service_principals(
        req: &MapRequest<'_>,
        data: &dyn DataAccess,
    ) -> Result<Option<Value>, MapError> {
        let key = lookup_key(req, "servicePrincipal-id");
        match req.method.as_str() {
            "GET" | "HEAD" => match key {
                Some(key) => {
                    let principals = data.service_principals();
                    let sp = principals
                        .iter()
                        .find(|sp| sp.object_id == key)
                        .or_else(|| principals.iter().find(|sp| sp.application_id == key))
                        .ok_or_else(|| MapError::not_found("service principal", key))?;
                    to_value(GraphServicePrincipal::from(*sp)).map(Some)
                }
                None => {
                    let value = data
                        .service_principals()
                        .into_iter()
                        .map(|sp| to_value(GraphServicePrincipal::from(sp)))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some(json!({
                        "@odata.context": SERVICE_PRINCIPALS_CONTEXT,
                        "value": limit(req, value),
                    })))
                }
            },
            other => Err(MapError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl FamilyResponseMapper for DirectoryMapper {
    fn family(&self) -> Family {
        Family::Directory
    }

    fn map(&self, req: &MapRequest<'_>, data: &dyn DataAccess) -> Result<Option<Value>, MapError> {
        let lower = req.path_pattern.to_ascii_lowercase();
        if lower.contains("/users") {
            Self::users(req, data)
        } else if lower.contains("/serviceprincipals") {
            Self::service_principals(req, data)
        } else {
            Ok(Some(json!({ "value": [] })))
        }
    }
}
