use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::measure::FontFace;

/// Associates each face used on a page with the TTF/OTF file it is loaded from.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FontsConfiguration {
    pub font_associations: Vec<FontAssociation>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FontAssociation {
    pub font_face: FontFace,
    pub font_file_path: PathBuf,
}

impl FontsConfiguration {
    pub fn from_path(fonts_configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(fonts_configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    "Failed to read the font configuration file",
                    &error,
                )
            })?;
        let mut configuration: FontsConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    "Failed to parse the font configuration file",
                    &error,
                )
            })?;

        // Relative font paths are resolved against the directory of the configuration file
        if let Some(configuration_directory) = fonts_configuration_file_path.parent() {
            for font_association in configuration.font_associations.iter_mut() {
                if font_association.font_file_path.is_relative() {
                    font_association.font_file_path =
                        configuration_directory.join(&font_association.font_file_path);
                }
            }
        }

        Ok(configuration)
    }

    pub fn get_font_path(&self, font_face: FontFace) -> Option<PathBuf> {
        self.font_associations
            .iter()
            .find(|font_association| font_association.font_face == font_face)
            .map(|font_association| font_association.font_file_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_are_looked_up_by_name() {
        let configuration: FontsConfiguration = serde_json::from_str(
            r#"{ "fontAssociations": [
                { "fontFace": "regular", "fontFilePath": "/fonts/Inter-Regular.ttf" },
                { "fontFace": "monospace", "fontFilePath": "/fonts/Cousine-Regular.ttf" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(
            configuration.get_font_path(FontFace::Monospace),
            Some(PathBuf::from("/fonts/Cousine-Regular.ttf"))
        );
        assert_eq!(configuration.get_font_path(FontFace::Bold), None);
    }
}
