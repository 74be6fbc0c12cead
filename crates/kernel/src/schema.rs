//! Catalogue schema descriptor.
//!
//! Maps logical field names to the physical table and column names of the
//! catalogue database so that no query string hardcodes a column. The
//! descriptor is built once at startup and shared read-only through
//! [`AppState`](crate::state::AppState); renaming a physical column means
//! editing exactly one entry here.
//!
//! The descriptor covers the externally loaded catalogue and the `LOGS` audit
//! table. Tables the application creates itself (`Users`, `Albums`,
//! `Collections`, `ExportRecords`) are named directly in [`crate::db`] and in
//! their models.

/// Physical table names.
#[derive(Debug, Clone)]
pub struct Tables {
    pub sources: &'static str,
    pub artifacts: &'static str,
    pub dimensions: &'static str,
    pub properties: &'static str,
    pub image_versions: &'static str,
    pub logs: &'static str,
}

/// `SOURCES` columns.
#[derive(Debug, Clone)]
pub struct SourceFields {
    pub id: &'static str,
    pub museum_code: &'static str,
    pub museum_name_cn: &'static str,
}

/// `ARTIFACTS` columns.
#[derive(Debug, Clone)]
pub struct ArtifactFields {
    pub id: &'static str,
    pub source_id: &'static str,
    pub original_id: &'static str,
    pub title_cn: &'static str,
    pub title_en: &'static str,
    pub description_cn: &'static str,
    pub classification: &'static str,
    pub material: &'static str,
    pub date_cn: &'static str,
    pub date_en: &'static str,
    pub start_year: &'static str,
    pub end_year: &'static str,
}

/// `DIMENSIONS` columns.
#[derive(Debug, Clone)]
pub struct DimensionFields {
    pub id: &'static str,
    pub artifact_id: &'static str,
    pub size_type: &'static str,
    pub size_value: &'static str,
    pub size_unit: &'static str,
}

/// `PROPERTIES` columns.
#[derive(Debug, Clone)]
pub struct PropertyFields {
    pub id: &'static str,
    pub artifact_id: &'static str,
    pub geography: &'static str,
    pub culture: &'static str,
    pub artist: &'static str,
    pub credit_line: &'static str,
    pub page_link: &'static str,
}

/// `IMAGE_VERSIONS` columns.
#[derive(Debug, Clone)]
pub struct ImageFields {
    pub id: &'static str,
    pub artifact_id: &'static str,
    pub version_type: &'static str,
    pub image_link: &'static str,
    pub local_path: &'static str,
}

/// `LOGS` columns (audit trail written by the admin console).
#[derive(Debug, Clone)]
pub struct LogFields {
    pub id: &'static str,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: &'static str,
    pub user_id: &'static str,
    pub ip_address: &'static str,
    pub details: &'static str,
    pub created_at: &'static str,
}

/// A reusable `LEFT JOIN` fragment: target table, alias, join condition, and
/// the aliased select list it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFragment {
    pub table: &'static str,
    pub alias: &'static str,
    pub on: String,
    pub select: Vec<String>,
}

impl JoinFragment {
    /// Render as `LEFT JOIN <table> <alias> ON <condition>`.
    pub fn left_join(&self) -> String {
        format!("LEFT JOIN {} {} ON {}", self.table, self.alias, self.on)
    }
}

/// The complete catalogue schema descriptor.
#[derive(Debug, Clone)]
pub struct Schema {
    pub tables: Tables,
    pub source: SourceFields,
    pub artifact: ArtifactFields,
    pub dimension: DimensionFields,
    pub property: PropertyFields,
    pub image: ImageFields,
    pub log: LogFields,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            tables: Tables {
                sources: "SOURCES",
                artifacts: "ARTIFACTS",
                dimensions: "DIMENSIONS",
                properties: "PROPERTIES",
                image_versions: "IMAGE_VERSIONS",
                logs: "LOGS",
            },
            source: SourceFields {
                id: "Source_ID",
                museum_code: "Museum_Code",
                museum_name_cn: "Museum_Name_CN",
            },
            artifact: ArtifactFields {
                id: "Artifact_PK",
                source_id: "Source_ID",
                original_id: "Original_ID",
                title_cn: "Title_CN",
                title_en: "Title_EN",
                description_cn: "Description_CN",
                classification: "Classification",
                material: "Material",
                date_cn: "Date_CN",
                date_en: "Date_EN",
                start_year: "Start_Year",
                end_year: "End_Year",
            },
            dimension: DimensionFields {
                id: "Dimension_PK",
                artifact_id: "Artifact_PK",
                size_type: "Size_Type",
                size_value: "Size_Value",
                size_unit: "Size_Unit",
            },
            property: PropertyFields {
                id: "Property_PK",
                artifact_id: "Artifact_PK",
                geography: "Geography",
                culture: "Culture",
                artist: "Artist",
                credit_line: "Credit_Line",
                page_link: "Page_Link",
            },
            image: ImageFields {
                id: "Version_PK",
                artifact_id: "Artifact_PK",
                version_type: "Version_Type",
                image_link: "Image_Link",
                local_path: "Local_Path",
            },
            log: LogFields {
                id: "Log_PK",
                action: "Action",
                entity_type: "Entity_Type",
                entity_id: "Entity_ID",
                user_id: "User_ID",
                ip_address: "IP_Address",
                details: "Details",
                created_at: "Created_At",
            },
        }
    }
}

impl Schema {
    /// Join from artifacts (`a`) to their source museum (`s`).
    pub fn sources_join(&self) -> JoinFragment {
        JoinFragment {
            table: self.tables.sources,
            alias: "s",
            on: format!("a.{} = s.{}", self.artifact.source_id, self.source.id),
            select: vec![format!("s.{} AS museum_name", self.source.museum_name_cn)],
        }
    }

    /// Join from artifacts (`a`) to their curated properties (`p`).
    pub fn properties_join(&self) -> JoinFragment {
        let p = &self.property;
        JoinFragment {
            table: self.tables.properties,
            alias: "p",
            on: format!("a.{} = p.{}", self.artifact.id, p.artifact_id),
            select: vec![
                format!("p.{} AS geography", p.geography),
                format!("p.{} AS culture_name", p.culture),
                format!("p.{} AS artist_name", p.artist),
                format!("p.{} AS credit_text", p.credit_line),
                format!("p.{} AS source_url", p.page_link),
            ],
        }
    }

    /// Join from artifacts (`a`) to their image versions (`iv`), selecting
    /// one arbitrary image path per artifact.
    pub fn images_join(&self) -> JoinFragment {
        JoinFragment {
            table: self.tables.image_versions,
            alias: "iv",
            on: format!("a.{} = iv.{}", self.artifact.id, self.image.artifact_id),
            select: vec![format!("ANY_VALUE(iv.{}) AS local_path", self.image.local_path)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_join_renders_table_alias_and_condition() {
        let schema = Schema::default();
        assert_eq!(
            schema.sources_join().left_join(),
            "LEFT JOIN SOURCES s ON a.Source_ID = s.Source_ID"
        );
    }

    #[test]
    fn properties_join_exposes_facet_aliases() {
        let join = Schema::default().properties_join();
        assert_eq!(join.alias, "p");
        assert!(join.select.contains(&"p.Culture AS culture_name".to_string()));
        assert!(join.select.contains(&"p.Geography AS geography".to_string()));
        assert_eq!(join.select.len(), 5);
    }

    #[test]
    fn images_join_uses_any_value_aggregate() {
        let join = Schema::default().images_join();
        assert_eq!(join.select, vec!["ANY_VALUE(iv.Local_Path) AS local_path"]);
        assert_eq!(join.on, "a.Artifact_PK = iv.Artifact_PK");
    }

    #[test]
    fn column_rename_flows_through_joins() {
        let mut schema = Schema::default();
        schema.property.culture = "Culture_Name";
        let join = schema.properties_join();
        assert!(join.select.contains(&"p.Culture_Name AS culture_name".to_string()));
    }
}
