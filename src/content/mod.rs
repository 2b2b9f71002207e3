//! Static site content: blog posts and the FAQ.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: &'static str,
    pub title: &'static str,
    pub slug: &'static str,
    pub date: &'static str,
    pub author: &'static str,
    pub excerpt: &'static str,
    /// HTML body
    pub content: &'static str,
    pub image_url: Option<&'static str>,
    pub tags: &'static [&'static str],
}

/// Listing entry without the post body.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostSummary {
    pub id: &'static str,
    pub title: &'static str,
    pub slug: &'static str,
    pub date: &'static str,
    pub author: &'static str,
    pub excerpt: &'static str,
    pub image_url: Option<&'static str>,
    pub tags: &'static [&'static str],
}

impl From<&BlogPost> for BlogPostSummary {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            date: post.date,
            author: post.author,
            excerpt: post.excerpt,
            image_url: post.image_url,
            tags: post.tags,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FaqEntry {
    pub question: &'static str,
    pub answer: &'static str,
}

pub static BLOG_POSTS: [BlogPost; 3] = [
    BlogPost {
        id: "1",
        title: "Primer Post de Komuni: Un Paso Hacia la Accesibilidad Universal",
        slug: "primer-post-de-komuni",
        date: "24 de julio de 2025",
        author: "Equipo Komuni",
        excerpt: "Descubre cómo Komuni está revolucionando la forma en que reportamos y abordamos las barreras de accesibilidad en nuestras ciudades. Un futuro más inclusivo comienza hoy.",
        content: r#"<p>Bienvenidos al blog de Komuni, el espacio donde compartiremos nuestras ideas, avances y noticias más relevantes sobre la accesibilidad y la construcción de comunidades inclusivas.</p>
<p>En este primer post, queremos reiterar nuestra misión: empoderar a los ciudadanos para que sean agentes de cambio. Cada barrera reportada en nuestro mapa no es solo un punto en una pantalla, es un paso hacia la eliminación de obstáculos físicos y la creación de entornos donde todos puedan participar plenamente.</p>
<h2>¿Qué nos impulsa?</h2>
<p>La visión de un mundo sin barreras. Creemos firmemente que la tecnología puede ser una herramienta poderosa para la inclusión. Nuestra plataforma no solo facilita el reporte de problemas, sino que también fomenta la colaboración entre usuarios, organizaciones y autoridades locales.</p>
<p>Gracias por unirte a esta causa. Juntos, haremos una diferencia real.</p>
<h3>Próximos Pasos</h3>
<ul>
  <li>Explora nuestro mapa interactivo.</li>
  <li>Colabora con la comunidad realizando reportes.</li>
  <li>Comparte tus experiencias y sugerencias.</li>
</ul>"#,
        image_url: Some("/images/blog/post1-featured.png"),
        tags: &["accesibilidad", "comunidad", "lanzamiento", "inclusión"],
    },
    BlogPost {
        id: "2",
        title: "Guía Rápida: Cómo Reportar una Barrera en Komuni",
        slug: "guia-reportar-barrera",
        date: "15 de julio de 2025",
        author: "Soporte Komuni",
        excerpt: "Aprende los sencillos pasos para identificar y reportar barreras de accesibilidad en nuestro mapa. Tu contribución es vital para nuestra comunidad.",
        content: r#"<p>Reportar una barrera en Komuni es un proceso intuitivo diseñado para ser rápido y eficiente. Sigue esta guía paso a paso para hacer tu primera contribución:</p>
<ol>
  <li><strong>Accede al Mapa:</strong> Navega a la sección 'Mapa' de nuestra web.</li>
  <li><strong>Localiza la Barrera:</strong> Usa el buscador o navega manualmente hasta la ubicación exacta de la barrera.</li>
  <li><strong>Haz Clic en "Reportar":</strong> Verás un botón o icono para iniciar el proceso de reporte.</li>
  <li><strong>Añade Detalles:</strong> Describe la barrera, selecciona su categoría (ej. rampa inaccesible, acera rota), y si es posible, sube una o varias fotos.</li>
  <li><strong>Envía el Reporte:</strong> Confirma la información y envía. ¡Tu reporte ya está en el mapa!</li>
</ol>
<p>Cada reporte ayuda a construir una base de datos más completa y a concienciar sobre los desafíos de accesibilidad en nuestras ciudades.</p>"#,
        image_url: Some("/images/blog/post2-featured.png"),
        tags: &["guía", "reporte", "mapa", "tutorial"],
    },
    BlogPost {
        id: "3",
        title: "La Importancia de la Inclusión Digital en la Accesibilidad Urbana",
        slug: "inclusion-digital-accesibilidad-urbana",
        date: "01 de julio de 2025",
        author: "Equipo Komuni",
        excerpt: "Exploramos cómo la tecnología y el diseño digital accesible son fundamentales para complementar los esfuerzos de accesibilidad física en las ciudades modernas.",
        content: r#"<p>La accesibilidad no se limita solo al entorno físico. En la era digital, la inclusión digital juega un papel crucial en cómo las personas interactúan con su ciudad y sus servicios.</p>
<p>Un sitio web municipal inaccesible, una aplicación de transporte público que no cumple con los estándares, o incluso la falta de información accesible sobre rutas peatonales, pueden ser tan restrictivos como una rampa mal diseñada.</p>
<p>En Komuni, entendemos esta interconexión. Nuestra plataforma está diseñada para ser accesible desde el primer día, y abogamos por la implementación de soluciones digitales inclusivas que complementen la infraestructura física.</p>
<p>La verdadera accesibilidad es un ecosistema donde lo físico y lo digital se unen para crear una experiencia fluida y equitativa para todos.</p>"#,
        image_url: Some("/images/blog/post3-featured.jpeg"),
        tags: &["inclusión digital", "tecnología", "accesibilidad"],
    },
];

pub static FAQ: [FaqEntry; 7] = [
    FaqEntry {
        question: "¿Qué es Komuni?",
        answer: "Komuni es una plataforma global diseñada para reportar barreras urbanas, mejorar la accesibilidad y construir una comunidad más inclusiva. Nuestro objetivo es conectar a las personas para que puedan identificar y solucionar problemas de accesibilidad en sus ciudades y en todo el mundo.",
    },
    FaqEntry {
        question: "¿Cómo puedo reportar una barrera?",
        answer: "Puedes reportar una barrera utilizando nuestro mapa interactivo. Simplemente ve a la sección 'Mapa', busca la ubicación de la barrera, y utiliza la herramienta de reporte para añadir detalles, fotos y la categoría de la barrera. Es un proceso sencillo y rápido.",
    },
    FaqEntry {
        question: "¿Qué tipo de barreras se pueden reportar?",
        answer: "Puedes reportar una amplia variedad de barreras, incluyendo aceras en mal estado, rampas inaccesibles, falta de señalización adecuada, obstáculos en vías públicas, transporte público no adaptado, y cualquier otra cosa que impida la libre movilidad o el acceso a personas con diversidad funcional.",
    },
    FaqEntry {
        question: "¿Es necesario registrarse para usar Komuni?",
        answer: "No es necesario registrarse para ver el mapa o leer nuestro blog y recursos educativos. Sin embargo, para reportar barreras, participar en el foro o contribuir activamente a la comunidad, sí necesitarás crear una cuenta gratuita.",
    },
    FaqEntry {
        question: "¿Cómo puedo colaborar con Komuni?",
        answer: "Hay muchas formas de colaborar: reportando barreras, compartiendo tus experiencias en el foro, difundiendo información sobre accesibilidad en tus redes sociales, o incluso ofreciéndote como voluntario para eventos o proyectos locales. ¡Tu participación es clave!",
    },
    FaqEntry {
        question: "¿Komuni está disponible en mi ciudad?",
        answer: "Komuni es una plataforma global, lo que significa que puedes usarla en cualquier ciudad del mundo. Cuantos más usuarios se unan y reporten, más completa y útil será la información disponible para todos.",
    },
    FaqEntry {
        question: "¿Cómo se utilizan los datos de las barreras reportadas?",
        answer: "Los datos de las barreras reportadas se utilizan para crear un mapa interactivo de accesibilidad. Esta información puede ser consultada por usuarios, organizaciones y autoridades locales para identificar áreas problemáticas y priorizar mejoras. No compartimos información personal sin tu consentimiento.",
    },
];

pub fn find_post(slug: &str) -> Option<&'static BlogPost> {
    BLOG_POSTS.iter().find(|post| post.slug == slug)
}
