// Table definitions for the diesel query builder. Keep in sync with `migrations/`.

diesel::table! {
    feed_data (item_id) {
        item_id -> Text,
        title -> Text,
        link -> Text,
        updated -> Timestamptz,
        author -> Nullable<Text>,
        summary -> Nullable<Text>,
        content -> Nullable<Text>,
    }
}

diesel::table! {
    feed_settings (guild_id) {
        guild_id -> BigInt,
        webhook_url -> Nullable<Text>,
        sub_role_id -> Nullable<BigInt>,
        avatar -> Nullable<Text>,
        delay -> Integer,
        ping -> Bool,
        enabled -> Bool,
    }
}

diesel::table! {
    series (shortname) {
        shortname -> Text,
        title -> Text,
        link -> Nullable<Text>,
        series_type -> Nullable<Text>,
        latest_chapter -> Nullable<Text>,
        updated -> Nullable<Timestamptz>,
        status -> Nullable<Text>,
        priority -> Nullable<Integer>,
        genres -> Array<Text>,
    }
}

diesel::table! {
    guild_config (guild_id, config_name) {
        guild_id -> BigInt,
        config_name -> Text,
        config_value -> Text,
    }
}

diesel::table! {
    prefix (guild_id) {
        guild_id -> BigInt,
        #[sql_name = "prefix"]
        prefix_ -> Text,
    }
}

diesel::table! {
    bot_logs (log_id) {
        log_id -> Uuid,
        created -> Timestamptz,
        logger_name -> Text,
        level_name -> Text,
        file_path -> Nullable<Text>,
        module -> Nullable<Text>,
        func_name -> Nullable<Text>,
        line_no -> Nullable<Integer>,
        message -> Text,
        traceback -> Nullable<Text>,
    }
}

diesel::table! {
    discord_messages (message_id, sent) {
        message_id -> BigInt,
        sent -> Timestamptz,
        is_edit -> Bool,
        deleted -> Bool,
        author_id -> BigInt,
        channel_id -> BigInt,
        guild_id -> Nullable<BigInt>,
        content -> Text,
        clean_content -> Text,
        embeds -> Nullable<Jsonb>,
        webhook_id -> Nullable<BigInt>,
        attachments -> Array<Text>,
    }
}

diesel::table! {
    command_log (message_id, sent) {
        message_id -> BigInt,
        sent -> Timestamptz,
        author_id -> BigInt,
        channel_id -> BigInt,
        guild_id -> Nullable<BigInt>,
        prefix -> Text,
        command -> Text,
        invoked_with -> Text,
        invoked_subcommand -> Nullable<Text>,
        subcommand_passed -> Nullable<Text>,
        command_failed -> Bool,
        cog -> Nullable<Text>,
    }
}

diesel::table! {
    member_activity (member_id, time) {
        member_id -> BigInt,
        time -> Timestamptz,
        status -> Nullable<Text>,
        from_status -> Nullable<Text>,
        guild_id -> BigInt,
        display_name -> Nullable<Text>,
    }
}

diesel::table! {
    osu_members (member_id) {
        member_id -> BigInt,
        osu_username -> Text,
    }
}

diesel::table! {
    colour_roles (guild_id, member_id) {
        guild_id -> BigInt,
        member_id -> BigInt,
        role_id -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    feed_data,
    feed_settings,
    series,
    guild_config,
    prefix,
    bot_logs,
    discord_messages,
    command_log,
    member_activity,
    osu_members,
    colour_roles,
);
