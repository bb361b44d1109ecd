// src/api/parser.rs
//! Response validation and mesh document parsing.

use super::client::ApiResponse;
use crate::algebras::FetchError;
use crate::model::Mesh;
use reqwest::StatusCode;
use serde::Deserialize;

/// Mesh document as served by the asset host.
#[derive(Debug, Deserialize)]
struct MeshDocument {
    #[serde(default)]
    vertices: Vec<f32>,
    #[serde(default)]
    faces: Vec<u32>,
}

/// Maps a non-success status to the matching [`FetchError`].
pub fn check_status<T>(response: &ApiResponse<T>) -> Result<(), FetchError> {
    let status = response.status;
    if status.is_success() {
        return Ok(());
    }

    log::debug!("HTTP {} from {}", status, response.url);
    Err(match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::NotFound {
            url: response.url.clone(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized {
            reason: format!("HTTP {} from {}", status, response.url),
        },
        _ => FetchError::HttpStatus {
            status: status.as_u16(),
            url: response.url.clone(),
        },
    })
}

/// Parses a `{vertices, faces}` JSON body into a [`Mesh`].
///
/// Vertices must come in xyz triples and faces in index triples that stay
/// within the vertex list.
pub fn parse_mesh_response(response: ApiResponse<Vec<u8>>) -> Result<Mesh, FetchError> {
    check_status(&response)?;

    let document: MeshDocument = serde_json::from_slice(&response.data).map_err(|e| {
        log::error!("Failed to parse mesh from {}: {}", response.url, e);
        FetchError::from(e)
    })?;

    if document.vertices.len() % 3 != 0 {
        return Err(FetchError::MalformedResponse {
            reason: format!(
                "{} vertex coordinates is not a multiple of 3",
                document.vertices.len()
            ),
        });
    }
    if document.faces.len() % 3 != 0 {
        return Err(FetchError::MalformedResponse {
            reason: format!("{} face indices is not a multiple of 3", document.faces.len()),
        });
    }

    let vertex_count = document.vertices.len() / 3;
    if let Some(index) = document.faces.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(FetchError::MalformedResponse {
            reason: format!("face index {} out of {} vertices", index, vertex_count),
        });
    }

    Ok(Mesh::new(document.vertices, document.faces))
}
