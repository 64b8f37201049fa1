use aide::axum::routing::{get_with, post_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::{Multipart, Path};
use axum::Json;
use axum_extra::extract::WithRejection;
use log::info;
use schemars::JsonSchema;
use serde::Serialize;

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::{AdminState, RequestState};
use crate::uploads::image_extension;

use super::utils::{
    data, message, require_text, Created, DataDto, MessageDto, MultipartForm, PathParam, Success,
};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/api/cafeterias-cercanas",
            get_with(list_cafes, list_cafes_docs),
        )
        .api_route(
            "/api/cafeterias/:id",
            get_with(get_cafe, get_cafe_docs)
                .put_with(update_cafe, update_cafe_docs)
                .delete_with(delete_cafe, delete_cafe_docs),
        )
        .api_route(
            "/api/registrar-cafeteria",
            post_with(create_cafe, create_cafe_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct CafeDto {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
    /// File name below `/uploads`.
    #[serde(rename = "imagen_url")]
    pub image: Option<String>,
    #[serde(rename = "calificacion_promedio")]
    pub average_rating: f64,
    #[serde(rename = "total_opiniones")]
    pub opinion_count: u64,
}

impl From<&models::RatedCafe> for CafeDto {
    fn from(value: &models::RatedCafe) -> Self {
        Self {
            id: value.cafe.id,
            name: value.cafe.name.to_owned(),
            address: value.cafe.address.to_owned(),
            latitude: value.cafe.latitude,
            longitude: value.cafe.longitude,
            image: value.cafe.image.to_owned(),
            average_rating: value.average_rating,
            opinion_count: value.opinion_count,
        }
    }
}

pub async fn list_cafes(
    mut state: RequestState,
) -> ServiceResult<Json<Success<DataDto<Vec<CafeDto>>>>> {
    let cafes = state.db.get_all_cafes().await?;
    Ok(data(cafes.iter().map(|c| c.into()).collect()))
}

fn list_cafes_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all cafes with their average rating.")
        .tag("cafes")
        .response::<200, Json<Success<DataDto<Vec<CafeDto>>>>>()
}

pub async fn get_cafe(
    mut state: RequestState,
    WithRejection(Path(id), _): PathParam<u64>,
) -> ServiceResult<Json<Success<DataDto<CafeDto>>>> {
    let cafe = state.db.get_cafe_by_id(id).await?;

    if let Some(cafe) = cafe {
        return Ok(data(CafeDto::from(&cafe)));
    }

    Err(ServiceError::NotFound("Cafe not found"))
}

fn get_cafe_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get a cafe by id.")
        .tag("cafes")
        .response::<200, Json<Success<DataDto<CafeDto>>>>()
        .response_with::<404, (), _>(|res| res.description("The requested cafe does not exist!"))
}

/// Raw multipart fields of the cafe form.
#[derive(Debug, Default)]
struct CafeForm {
    name: Option<String>,
    address: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    image: Option<models::Image>,
}

async fn read_cafe_form(mut multipart: Multipart) -> ServiceResult<CafeForm> {
    let mut form = CafeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_owned();

        if name == "imagen" || name == "image" {
            let content_type = field.content_type().unwrap_or("").to_lowercase();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;

            // browsers send an empty part if no file was selected
            if bytes.is_empty() {
                continue;
            }
            if image_extension(&content_type).is_none() {
                return Err(ServiceError::BadRequest(format!(
                    "Unsupported image type '{content_type}'"
                )));
            }

            form.image = Some(models::Image {
                data: bytes.to_vec(),
                mimetype: content_type,
            });
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "nombre" => form.name = Some(text),
            "direccion" => form.address = Some(text),
            "latitud" => form.latitude = Some(text),
            "longitud" => form.longitude = Some(text),
            _ => {}
        }
    }

    Ok(form)
}

#[derive(Debug, PartialEq)]
struct CafeFields {
    name: String,
    address: Option<String>,
    latitude: f64,
    longitude: f64,
}

fn parse_coordinate(value: Option<&str>, field: &str, limit: f64) -> ServiceResult<f64> {
    let value = require_text(value, field)?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .ok_or_else(|| ServiceError::BadRequest(format!("Invalid value for field '{field}'")))
}

impl CafeForm {
    fn validate(&self) -> ServiceResult<CafeFields> {
        Ok(CafeFields {
            name: require_text(self.name.as_deref(), "nombre")?,
            address: self
                .address
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_owned),
            latitude: parse_coordinate(self.latitude.as_deref(), "latitud", 90.0)?,
            longitude: parse_coordinate(self.longitude.as_deref(), "longitud", 180.0)?,
        })
    }
}

async fn create_cafe(
    mut state: AdminState,
    WithRejection(multipart, _): MultipartForm,
) -> ServiceResult<Created<Success<DataDto<CafeDto>>>> {
    let mut form = read_cafe_form(multipart).await?;
    let fields = form.validate()?;

    let image = match form.image.take() {
        Some(image) => Some(state.images.store(&image).await?),
        None => None,
    };

    let cafe = models::Cafe {
        id: 0,
        name: fields.name,
        address: fields.address,
        latitude: fields.latitude,
        longitude: fields.longitude,
        image: image.clone(),
    };

    let cafe = match state.db.store_cafe(cafe).await {
        Ok(cafe) => cafe,
        Err(e) => {
            if let Some(image) = image {
                state.images.remove(&image).await;
            }
            return Err(e);
        }
    };
    info!("Created cafe {} ({})", cafe.id, cafe.name);

    let cafe = models::RatedCafe {
        cafe,
        average_rating: 0.0,
        opinion_count: 0,
    };
    Ok(Created(data(CafeDto::from(&cafe)).0))
}

fn create_cafe_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Create a new cafe. Multipart form with the fields `nombre`, `direccion`, `latitud`, `longitud` and an optional file `imagen`.",
    )
    .tag("cafes")
    .response::<201, Json<Success<DataDto<CafeDto>>>>()
    .response_with::<400, (), _>(|res| res.description("Missing or invalid fields!"))
    .response_with::<401, (), _>(|res| res.description("Missing login!"))
    .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
    .security_requirement_scopes("SessionToken", ["admin"])
}

async fn update_cafe(
    mut state: AdminState,
    WithRejection(Path(id), _): PathParam<u64>,
    WithRejection(multipart, _): MultipartForm,
) -> ServiceResult<Json<Success<DataDto<CafeDto>>>> {
    let mut form = read_cafe_form(multipart).await?;
    let fields = form.validate()?;

    let existing = state
        .db
        .get_cafe_by_id(id)
        .await?
        .ok_or(ServiceError::NotFound("Cafe not found"))?;

    let new_image = match form.image.take() {
        Some(image) => Some(state.images.store(&image).await?),
        None => None,
    };

    let cafe = models::Cafe {
        id,
        name: fields.name,
        address: fields.address,
        latitude: fields.latitude,
        longitude: fields.longitude,
        image: new_image.clone().or_else(|| existing.cafe.image.clone()),
    };

    let cafe = match state.db.store_cafe(cafe).await {
        Ok(cafe) => cafe,
        Err(e) => {
            if let Some(image) = new_image {
                state.images.remove(&image).await;
            }
            return Err(e);
        }
    };

    if new_image.is_some() {
        if let Some(old_image) = existing.cafe.image {
            state.images.remove(&old_image).await;
        }
    }
    info!("Updated cafe {}", cafe.id);

    let cafe = models::RatedCafe {
        cafe,
        average_rating: existing.average_rating,
        opinion_count: existing.opinion_count,
    };
    Ok(data(CafeDto::from(&cafe)))
}

fn update_cafe_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Update an existing cafe. Same form as for creation, the image is kept if no new one is sent.",
    )
    .tag("cafes")
    .response::<200, Json<Success<DataDto<CafeDto>>>>()
    .response_with::<400, (), _>(|res| res.description("Missing or invalid fields!"))
    .response_with::<404, (), _>(|res| res.description("The requested cafe does not exist!"))
    .response_with::<401, (), _>(|res| res.description("Missing login!"))
    .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
    .security_requirement_scopes("SessionToken", ["admin"])
}

async fn delete_cafe(
    mut state: AdminState,
    WithRejection(Path(id), _): PathParam<u64>,
) -> ServiceResult<Json<Success<MessageDto>>> {
    let cafe = state.db.delete_cafe(id).await?;
    if let Some(image) = cafe.image {
        state.images.remove(&image).await;
    }
    info!("Deleted cafe {}", id);

    Ok(message("Cafe deleted"))
}

fn delete_cafe_docs(op: TransformOperation) -> TransformOperation {
    op.description("Delete an existing cafe together with its opinions, stamps and follows.")
        .tag("cafes")
        .response::<200, Json<Success<MessageDto>>>()
        .response_with::<404, (), _>(|res| res.description("The requested cafe does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["admin"])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, latitude: &str, longitude: &str) -> CafeForm {
        CafeForm {
            name: Some(name.to_owned()),
            address: Some("  ".to_owned()),
            latitude: Some(latitude.to_owned()),
            longitude: Some(longitude.to_owned()),
            image: None,
        }
    }

    #[test]
    fn test_validate_cafe_form() {
        assert_eq!(
            form(" Cafe Central ", "19.43", "-99.13").validate(),
            Ok(CafeFields {
                name: "Cafe Central".to_owned(),
                address: None,
                latitude: 19.43,
                longitude: -99.13,
            })
        );
    }

    #[test]
    fn test_validate_cafe_form_requires_fields() {
        assert!(CafeForm::default().validate().is_err());
        assert!(form("", "1", "1").validate().is_err());
        assert!(form("Cafe", "", "1").validate().is_err());
        assert!(form("Cafe", "1", "east").validate().is_err());
    }

    #[test]
    fn test_validate_cafe_form_checks_ranges() {
        assert!(form("Cafe", "90.5", "0").validate().is_err());
        assert!(form("Cafe", "0", "-180.1").validate().is_err());
        assert!(form("Cafe", "NaN", "0").validate().is_err());
        assert!(form("Cafe", "-90", "180").validate().is_ok());
    }
}
