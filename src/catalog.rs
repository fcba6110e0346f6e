use crate::{
    error::{CaricatureError, Result},
    models::StyleDefinition,
};
use std::collections::HashSet;
use std::path::Path;

/// Built-in caricature presets: (id, display name, instruction).
const BUILTIN_STYLES: &[(&str, &str, &str)] = &[
    (
        "classic",
        "Clássica Colorida",
        "Transformar a foto em uma caricatura colorida, com traços exagerados porém harmônicos, estilo desenho artístico clássico.",
    ),
    (
        "pixar",
        "Cartoon 3D Pixar",
        "Transformar a foto em um cartoon 3D estilo Pixar, com olhos maiores, brilho suave e acabamento cinematográfico.",
    ),
    (
        "exaggerated",
        "Super Exagerada",
        "Uma caricatura extremamente exagerada e cômica, estilo artista de rua, com cabeça gigante (big head) e corpo minúsculo, enfatizando o nariz e o sorriso de forma humorística e divertida.",
    ),
    (
        "clay",
        "Massinha Divertida",
        "Transformar a pessoa em um boneco cômico feito de massinha de modelar (claymation), estilo stop-motion, texturas de plastilina, visual arredondado, engraçado e olhos arregalados.",
    ),
    (
        "rubberhose",
        "Retrô Anos 30",
        "Transformar a foto em um cartoon vintage estilo anos 1930 (rubber hose animation), preto e branco, traços curvos e soltos, olhos \"pac-man\", muito expressivo e engraçado.",
    ),
    (
        "pencil",
        "Lápis P&B",
        "Transformar a foto em uma caricatura feita à mão com lápis, preto e branco, textura artística suave.",
    ),
    (
        "comic",
        "HQ/Comic",
        "Transformar a foto em uma caricatura estilo HQ, cores vibrantes, contornos fortes, look de quadrinhos.",
    ),
    (
        "anime",
        "Anime",
        "Transformar a foto em uma caricatura estilo anime, com olhos expressivos, traços definidos e paleta vibrante.",
    ),
    (
        "simpsons",
        "Simpsons",
        "Transformar a foto em uma caricatura no estilo Simpsons: pele amarela, olhos grandes arredondados, traços simples, aparência de desenho da série.",
    ),
    (
        "chaves",
        "Chaves",
        "Transformar a foto em caricatura estilo Chaves (El Chavo), com traços simples, cores chapadas e aparência de cartoon clássico mexicano.",
    ),
    (
        "disney",
        "Disney",
        "Transformar a foto em um personagem estilo Disney clássico, com olhos grandes, iluminação suave e aparência de animação tradicional.",
    ),
    (
        "lego",
        "Lego",
        "Transformar a foto em uma mini-figura Lego, com cabeça redonda icônica, textura plástica e expressões simples.",
    ),
    (
        "charge",
        "Caricatura de Jornal (Charge)",
        "Transformar a foto em uma caricatura estilo charge de jornal dos anos 90: traços exagerados, contorno forte, aparência satírica, preto e branco com detalhes rabiscados.",
    ),
    (
        "cyberpunk",
        "Cyberpunk Neon",
        "Transformar a foto em estilo cyberpunk neon, com luzes vibrantes, contraste forte e atmosfera futurista.",
    ),
];

/// Ordered, validated list of styles used for every batch.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    styles: Vec<StyleDefinition>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        StyleCatalog {
            styles: BUILTIN_STYLES
                .iter()
                .map(|(id, name, instruction)| StyleDefinition::new(*id, *name, *instruction))
                .collect(),
        }
    }
}

impl StyleCatalog {
    pub fn new(styles: Vec<StyleDefinition>) -> Result<Self> {
        if styles.is_empty() {
            return Err(CaricatureError::ConfigError(
                "Style catalog must contain at least one style".into(),
            ));
        }

        let mut seen = HashSet::new();
        for style in &styles {
            if style.id.trim().is_empty() {
                return Err(CaricatureError::ConfigError(
                    "Style id must not be empty".into(),
                ));
            }
            if style.instruction.trim().is_empty() {
                return Err(CaricatureError::ConfigError(format!(
                    "Style '{}' has an empty instruction",
                    style.id
                )));
            }
            if !seen.insert(style.id.as_str()) {
                return Err(CaricatureError::ConfigError(format!(
                    "Duplicate style id: {}",
                    style.id
                )));
            }
        }

        Ok(Self { styles })
    }

    /// Parses a JSON array of `{ "id", "displayName", "instruction" }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let styles: Vec<StyleDefinition> = serde_json::from_str(json)
            .map_err(|e| CaricatureError::ConfigError(format!("Invalid style catalog: {}", e)))?;
        Self::new(styles)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CaricatureError::ConfigError(format!(
                "Failed to read style catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        log::info!("Loading style catalog from {}", path.display());
        Self::from_json_str(&json)
    }

    pub fn list_styles(&self) -> &[StyleDefinition] {
        &self.styles
    }

    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.iter().find(|style| style.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.styles.iter().map(|style| style.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalog_is_ordered_and_unique() {
        let catalog = StyleCatalog::default();
        assert_eq!(catalog.len(), 14);
        assert_eq!(catalog.ids()[0], "classic");
        assert_eq!(catalog.ids()[13], "cyberpunk");

        // Must also pass the same validation external catalogs go through.
        assert!(StyleCatalog::new(catalog.list_styles().to_vec()).is_ok());
    }

    #[test]
    fn list_styles_is_deterministic() {
        let catalog = StyleCatalog::default();
        assert_eq!(catalog.list_styles(), catalog.list_styles());
        assert_eq!(catalog.get("anime").unwrap().display_name, "Anime");
        assert!(catalog.get("watercolor").is_none());
    }

    #[test]
    fn parses_json_catalog() {
        let catalog = StyleCatalog::from_json_str(
            r#"[
                {"id": "classic", "displayName": "Classic", "instruction": "Classic caricature"},
                {"id": "anime", "displayName": "Anime", "instruction": "Anime caricature"}
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.ids(), vec!["classic", "anime"]);
    }

    #[test]
    fn rejects_invalid_catalogs() {
        assert!(StyleCatalog::new(vec![]).is_err());
        assert!(StyleCatalog::from_json_str("{}").is_err());

        let duplicate = StyleCatalog::new(vec![
            StyleDefinition::new("anime", "Anime", "a"),
            StyleDefinition::new("anime", "Anime 2", "b"),
        ]);
        match duplicate {
            Err(CaricatureError::ConfigError(msg)) => assert!(msg.contains("anime")),
            other => panic!("expected config error, got {:?}", other),
        }

        assert!(StyleCatalog::new(vec![StyleDefinition::new(" ", "Blank", "x")]).is_err());
        assert!(StyleCatalog::new(vec![StyleDefinition::new("empty", "Empty", "  ")]).is_err());
    }

    #[test]
    fn loads_catalog_from_file() {
        let path = std::env::temp_dir().join(format!("caricatura-styles-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"[{"id":"lego","displayName":"Lego","instruction":"Make it a minifigure"}]"#)
            .unwrap();

        let catalog = StyleCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        std::fs::remove_file(&path).unwrap();

        assert!(StyleCatalog::from_json_file(&path).is_err());
    }
}
