//! Server-rendered HTML: marketing pages and dashboard shells

use url::form_urlencoded;

use crate::hooks::{HookState, YearMonth};
use crate::model::{CalendarEvent, Client, Prescription, PrescriptionStatus, Profile};

/// A published blog article
#[derive(Debug, Clone, Copy)]
pub struct BlogPost {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub body: &'static str,
    pub published: &'static str,
}

pub const BLOG_POSTS: &[BlogPost] = &[
    BlogPost {
        slug: "prescricao-em-minutos",
        title: "Prescrições nutricionais em minutos",
        summary: "Como a Nutrimatic monta o plano alimentar a partir da anamnese.",
        body: "A Nutrimatic transforma a anamnese do paciente em um plano alimentar completo. \
               Você revisa, aprova ou pede ajustes, e o PDF final chega ao paciente automaticamente.",
        published: "2025-02-10",
    },
    BlogPost {
        slug: "agenda-integrada",
        title: "Agenda integrada ao consultório",
        summary: "Consultas, retornos e avaliações em um único calendário.",
        body: "Cada evento da agenda aparece com uma cor pelo tipo de ação: consultas, retornos, \
               avaliações e envios de prescrição ficam fáceis de distinguir no mês.",
        published: "2025-03-05",
    },
];

pub fn find_post(slug: &str) -> Option<&'static BlogPost> {
    BLOG_POSTS.iter().find(|p| p.slug == slug)
}

/// A subscription tier on the pricing page
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub name: &'static str,
    pub monthly_price_brl: u32,
    pub prescriptions: u32,
    pub highlight: bool,
}

pub const PLANS: &[Plan] = &[
    Plan {
        name: "Essencial",
        monthly_price_brl: 97,
        prescriptions: 10,
        highlight: false,
    },
    Plan {
        name: "Profissional",
        monthly_price_brl: 197,
        prescriptions: 40,
        highlight: true,
    },
    Plan {
        name: "Clínica",
        monthly_price_brl: 397,
        prescriptions: 120,
        highlight: false,
    },
];

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, nav: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} | Nutrimatic</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <nav style="display: flex; gap: 1rem; padding-bottom: 1rem; border-bottom: 1px solid #dee2e6;">{nav}</nav>
    <main>{content}</main>
</body>
</html>"#,
        title = escape(title),
        nav = nav,
        content = content,
    )
}

fn public_nav() -> &'static str {
    r#"<a href="/"><strong>Nutrimatic</strong></a><a href="/pricing">Planos</a><a href="/blog">Blog</a><a href="/login">Entrar</a>"#
}

fn dashboard_nav() -> &'static str {
    r#"<a href="/dashboard"><strong>Nutrimatic</strong></a><a href="/dashboard">Prescrições</a><a href="/dashboard/calendar">Agenda</a><a href="/dashboard/clients">Clientes</a><form method="post" action="/logout" style="margin:0"><button type="submit">Sair</button></form>"#
}

fn error_banner(error: &Option<String>) -> String {
    match error {
        Some(message) => format!(
            r#"<p role="alert" style="padding: 0.5rem; color: #721c24; background-color: #f8d7da;">{}</p>"#,
            escape(message)
        ),
        None => String::new(),
    }
}

pub fn home() -> String {
    layout(
        "Início",
        public_nav(),
        r#"<section>
        <h1>Prescrições nutricionais automatizadas</h1>
        <p>Envie a anamnese, revise o plano gerado e aprove com um clique. O paciente recebe o PDF na hora.</p>
        <a href="/pricing">Ver planos</a>
    </section>"#,
    )
}

pub fn pricing() -> String {
    let cards: String = PLANS
        .iter()
        .map(|plan| {
            let border = if plan.highlight { "#198754" } else { "#dee2e6" };
            format!(
                r#"<div style="border: 2px solid {}; border-radius: 0.5rem; padding: 1rem;">
                    <h2>{}</h2>
                    <p><strong>R$ {}</strong>/mês</p>
                    <p>{} prescrições por mês</p>
                </div>"#,
                border,
                escape(plan.name),
                plan.monthly_price_brl,
                plan.prescriptions
            )
        })
        .collect();
    layout(
        "Planos",
        public_nav(),
        &format!(
            r#"<h1>Planos</h1><div style="display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem;">{}</div>"#,
            cards
        ),
    )
}

pub fn blog_index() -> String {
    let items: String = BLOG_POSTS
        .iter()
        .map(|p| {
            format!(
                r#"<article><h2><a href="/blog/{}">{}</a></h2><p><small>{}</small></p><p>{}</p></article>"#,
                p.slug,
                escape(p.title),
                p.published,
                escape(p.summary)
            )
        })
        .collect();
    layout("Blog", public_nav(), &format!("<h1>Blog</h1>{}", items))
}

pub fn blog_post(post: &BlogPost) -> String {
    layout(
        post.title,
        public_nav(),
        &format!(
            r#"<article><h1>{}</h1><p><small>{}</small></p><p>{}</p><a href="/blog">Voltar ao blog</a></article>"#,
            escape(post.title),
            post.published,
            escape(post.body)
        ),
    )
}

pub fn not_found() -> String {
    layout(
        "Página não encontrada",
        public_nav(),
        "<h1>Página não encontrada</h1>",
    )
}

pub fn login(error: Option<&str>) -> String {
    let banner = error_banner(&error.map(str::to_string));
    layout(
        "Entrar",
        public_nav(),
        &format!(
            r#"<h1>Entrar</h1>{}
    <form method="post" action="/login" style="display: grid; gap: 0.5rem; max-width: 320px;">
        <label>E-mail <input type="email" name="email" required></label>
        <label>Senha <input type="password" name="password" required></label>
        <button type="submit">Entrar</button>
    </form>"#,
            banner
        ),
    )
}

pub fn setup(profile: Option<&Profile>) -> String {
    let name = profile.map(|p| escape(&p.name)).unwrap_or_default();
    layout(
        "Configurar conta",
        public_nav(),
        &format!(
            r#"<h1>Configure sua conta</h1>
    <p>Ative seu perfil de nutricionista para começar a gerar prescrições.</p>
    <form method="post" action="/setup" style="display: grid; gap: 0.5rem; max-width: 320px;">
        <label>Nome <input type="text" name="name" value="{}"></label>
        <button type="submit">Ativar perfil</button>
    </form>"#,
            name
        ),
    )
}

fn status_badge(status: PrescriptionStatus) -> String {
    let (color, bg) = match status {
        PrescriptionStatus::Approved => ("#155724", "#d4edda"),
        PrescriptionStatus::Redo => ("#721c24", "#f8d7da"),
        PrescriptionStatus::Pending => ("#383d41", "#e2e3e5"),
    };
    format!(
        r#"<span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>"#,
        color, bg, status
    )
}

pub fn dashboard(profile: Option<&Profile>, prescriptions: &HookState<Prescription>) -> String {
    let usage = match profile {
        Some(p) => format!(
            "<p>Olá, {}. Prescrições usadas: {} de {} ({} restantes).</p>",
            escape(&p.name),
            p.generated_count,
            p.max_allowed,
            p.remaining()
        ),
        None => r#"<p>Perfil ainda não configurado. <a href="/setup">Configurar agora</a>.</p>"#
            .to_string(),
    };

    let rows: String = prescriptions
        .data
        .iter()
        .map(|p| {
            let file = match &p.file_url {
                Some(url) => format!(
                    r#"<a href="{}" target="_blank">PDF</a>"#,
                    escape(&proxy_href(url))
                ),
                None => "—".to_string(),
            };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">
                        <button onclick="review('{id}', 'approve')">Aprovar</button>
                        <button onclick="review('{id}', 'redo')">Refazer</button>
                    </td>
                </tr>"#,
                escape(&p.client_name),
                status_badge(p.status),
                file,
                id = p.id,
            )
        })
        .collect();

    layout(
        "Prescrições",
        dashboard_nav(),
        &format!(
            r#"<h1>Prescrições</h1>{usage}{error}
    <table style="width: 100%; border-collapse: collapse;">
        <thead>
            <tr style="border-bottom: 2px solid #dee2e6;">
                <th style="padding: 0.5rem; text-align: left;">Cliente</th>
                <th style="padding: 0.5rem; text-align: left;">Status</th>
                <th style="padding: 0.5rem; text-align: left;">Arquivo</th>
                <th style="padding: 0.5rem; text-align: left;">Ações</th>
            </tr>
        </thead>
        <tbody>{rows}</tbody>
    </table>
    <script>
        function review(id, action) {{
            fetch('/api/prescriptions/' + id + '/' + action, {{ method: 'POST' }})
                .then(() => window.location.reload());
        }}
    </script>"#,
            usage = usage,
            error = error_banner(&prescriptions.error),
            rows = rows,
        ),
    )
}

pub fn calendar(month: YearMonth, events: &HookState<CalendarEvent>) -> String {
    let items: String = events
        .data
        .iter()
        .map(|e| {
            format!(
                r#"<li style="padding: 0.5rem; margin-bottom: 0.25rem; background-color: {};">{} {} · {}</li>"#,
                e.color.css(),
                e.date.format("%d/%m"),
                e.time.as_deref().unwrap_or(""),
                escape(&e.title)
            )
        })
        .collect();
    let empty = if events.data.is_empty() && events.error.is_none() {
        "<p>Nenhum evento neste mês.</p>"
    } else {
        ""
    };

    layout(
        "Agenda",
        dashboard_nav(),
        &format!(
            r#"<h1>Agenda {month}</h1>
    <p><a href="/dashboard/calendar?month={prev}">&larr; {prev}</a> | <a href="/dashboard/calendar?month={next}">{next} &rarr;</a></p>
    {error}{empty}<ul style="list-style: none; padding: 0;">{items}</ul>"#,
            month = month,
            prev = month.previous(),
            next = month.next(),
            error = error_banner(&events.error),
            empty = empty,
            items = items,
        ),
    )
}

pub fn clients(clients: &HookState<Client>) -> String {
    let rows: String = clients
        .data
        .iter()
        .map(|c| {
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;"><td style="padding: 0.5rem;">{}</td><td style="padding: 0.5rem;">{}</td><td style="padding: 0.5rem;">{}</td></tr>"#,
                escape(&c.name),
                escape(&c.phone),
                c.status
            )
        })
        .collect();
    layout(
        "Clientes",
        dashboard_nav(),
        &format!(
            r#"<h1>Clientes</h1>{}
    <table style="width: 100%; border-collapse: collapse;">
        <thead>
            <tr style="border-bottom: 2px solid #dee2e6;">
                <th style="padding: 0.5rem; text-align: left;">Nome</th>
                <th style="padding: 0.5rem; text-align: left;">Telefone</th>
                <th style="padding: 0.5rem; text-align: left;">Status</th>
            </tr>
        </thead>
        <tbody>{}</tbody>
    </table>"#,
            error_banner(&clients.error),
            rows
        ),
    )
}

fn proxy_href(target: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("url", target)
        .finish();
    format!("/api/proxy?{}", query)
}
