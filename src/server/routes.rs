use log::{debug, warn};

use super::page;
use crate::{
    color::{parse_hex, Brightness},
    control::{
        parse_brightness, AnimationMode, ControlUpdate, FieldOutcome, SharedControl, UpdateReport,
    },
    error::NeopixelError,
    http::{JsonBody, Method, Request, Response},
};

/// Route one parsed request. Errors come back as values for the caller to
/// turn into a response.
pub async fn dispatch(
    control: &SharedControl,
    request: &Request,
) -> Result<Response, NeopixelError> {
    match (&request.method, request.path.as_str()) {
        (Method::Get, "/") | (Method::Get, "/index.html") => status_page(control).await,
        (Method::Get | Method::Post, "/update") => update(control, request).await,
        (Method::Get, "/off") => {
            control.apply(&ControlUpdate::off()).await;
            status_page(control).await
        }
        (Method::Get, "/rainbow") => rainbow(control, request).await,
        (Method::Get, "/color") => color(control, request).await,
        // Any other GET gets the page
        (Method::Get, _) => status_page(control).await,
        (method, path) => Err(NeopixelError::UnknownRoute {
            method: method.to_string(),
            path: path.to_string(),
        }),
    }
}

async fn status_page(control: &SharedControl) -> Result<Response, NeopixelError> {
    Ok(Response::html(page::render(&control.snapshot().await)))
}

/// Apply whichever fields the payload carries. A JSON body wins over the
/// query string. A field of the wrong type rejects the whole update.
async fn update(control: &SharedControl, request: &Request) -> Result<Response, NeopixelError> {
    let report = match &request.body {
        JsonBody::Malformed(reason) => {
            return Err(NeopixelError::MalformedRequest(format!("body: {}", reason)))
        }
        JsonBody::Fields(fields) => UpdateReport::from_json(fields),
        JsonBody::Absent => UpdateReport::from_query(&request.query),
    };

    let rejected = report
        .rejected()
        .filter_map(|outcome| match outcome {
            FieldOutcome::WrongType { field, reason } => Some(format!("{}: {}", field, reason)),
            _ => None,
        })
        .collect::<Vec<_>>();
    if !rejected.is_empty() {
        return Err(NeopixelError::MalformedRequest(rejected.join(", ")));
    }

    for outcome in &report.outcomes {
        if let FieldOutcome::Unknown(field) = outcome {
            debug!("Update: ignoring unknown field {:?}", field);
        }
    }

    if report.outcomes.is_empty() {
        return Ok(Response::text(200, "No data received"));
    }

    control.apply(&report.update).await;
    Ok(Response::text(200, "Settings updated"))
}

async fn rainbow(control: &SharedControl, request: &Request) -> Result<Response, NeopixelError> {
    let mut update = ControlUpdate {
        mode: Some(AnimationMode::Rainbow),
        ..Default::default()
    };
    if let Some(value) = request.param("brightness") {
        update.brightness = Some(brightness(value)?);
    }

    control.apply(&update).await;
    status_page(control).await
}

/// `/color?value=RRGGBB&brightness=N`, brightness on the 0..=255 scale
async fn color(control: &SharedControl, request: &Request) -> Result<Response, NeopixelError> {
    let value = request
        .param("value")
        .ok_or_else(|| NeopixelError::MalformedRequest("missing colour value".to_string()))?;
    let static_color = parse_hex(value).ok_or_else(|| {
        warn!("Color: rejecting {:?}", value);
        NeopixelError::MalformedRequest(format!("{:?} is not an RRGGBB colour", value))
    })?;

    let mut update = ControlUpdate {
        mode: Some(AnimationMode::Static),
        static_color: Some(static_color),
        ..Default::default()
    };
    if let Some(value) = request.param("brightness") {
        update.brightness = Some(brightness(value)?);
    }

    control.apply(&update).await;
    status_page(control).await
}

fn brightness(value: &str) -> Result<Brightness, NeopixelError> {
    parse_brightness(value)
        .map_err(|reason| NeopixelError::MalformedRequest(format!("brightness: {}", reason)))
}
